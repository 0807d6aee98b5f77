//! Static word tables for the lexical analyzer. Tokens are lower-case with punctuation
//! (including apostrophes) already stripped, so entries are written the same way.

/// Valence per word on a -4..=4 scale.
pub(crate) const VALENCE: &[(&str, f32)] = &[
    ("abandon", -1.9),
    ("abandoned", -2.0),
    ("accept", 1.6),
    ("accepted", 1.1),
    ("ache", -1.6),
    ("aching", -2.2),
    ("admire", 2.1),
    ("adore", 2.6),
    ("afraid", -2.0),
    ("aggressive", -0.6),
    ("agony", -1.8),
    ("agree", 1.5),
    ("alarm", -1.4),
    ("alarmed", -1.4),
    ("alone", -1.0),
    ("amazing", 2.8),
    ("anger", -2.7),
    ("angry", -2.3),
    ("anguish", -2.9),
    ("annoyed", -1.6),
    ("annoying", -1.7),
    ("anxiety", -0.7),
    ("anxious", -1.0),
    ("appreciate", 1.7),
    ("ashamed", -2.1),
    ("attack", -2.1),
    ("awesome", 3.1),
    ("awful", -2.0),
    ("bad", -2.5),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("better", 1.9),
    ("bitter", -1.8),
    ("blame", -1.4),
    ("bless", 2.5),
    ("bored", -1.1),
    ("boring", -1.3),
    ("brave", 2.4),
    ("bright", 1.9),
    ("broken", -2.1),
    ("calm", 1.3),
    ("care", 2.2),
    ("careful", 0.6),
    ("celebrate", 2.7),
    ("cheer", 2.3),
    ("cheerful", 2.5),
    ("comfort", 1.5),
    ("comfortable", 2.3),
    ("confident", 2.2),
    ("confused", -1.3),
    ("cool", 1.3),
    ("crap", -1.6),
    ("crazy", -1.4),
    ("cried", -1.6),
    ("cruel", -2.8),
    ("cry", -2.1),
    ("crying", -2.1),
    ("damn", -1.7),
    ("danger", -2.4),
    ("dangerous", -2.1),
    ("dead", -3.3),
    ("death", -2.9),
    ("delight", 2.9),
    ("delighted", 2.9),
    ("depressed", -2.3),
    ("depression", -2.7),
    ("desperate", -1.3),
    ("despair", -2.9),
    ("destroy", -2.5),
    ("die", -2.9),
    ("disappointed", -1.9),
    ("disaster", -3.1),
    ("disgusting", -2.4),
    ("distress", -2.4),
    ("dread", -2.0),
    ("dumb", -2.3),
    ("easy", 1.9),
    ("embarrassed", -1.5),
    ("empty", -0.8),
    ("enjoy", 2.2),
    ("enjoyed", 2.3),
    ("enough", 0.5),
    ("excellent", 2.7),
    ("excited", 1.4),
    ("exciting", 2.2),
    ("exhausted", -1.5),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("fantastic", 2.6),
    ("fear", -2.2),
    ("fearful", -2.2),
    ("fight", -1.6),
    ("fine", 0.8),
    ("fool", -1.9),
    ("forgive", 1.1),
    ("free", 2.3),
    ("friend", 2.2),
    ("friendly", 2.2),
    ("fun", 2.3),
    ("funny", 1.9),
    ("furious", -2.7),
    ("gentle", 1.9),
    ("gift", 1.9),
    ("glad", 2.0),
    ("good", 1.9),
    ("grateful", 2.0),
    ("great", 3.1),
    ("grief", -2.2),
    ("guilty", -1.8),
    ("haha", 2.0),
    ("happiness", 2.6),
    ("happy", 2.7),
    ("harm", -2.5),
    ("hate", -2.7),
    ("hated", -3.2),
    ("hatred", -3.2),
    ("heartbroken", -3.3),
    ("hell", -3.6),
    ("help", 1.7),
    ("helpless", -2.0),
    ("honest", 2.3),
    ("hope", 1.9),
    ("hopeful", 2.2),
    ("hopeless", -2.0),
    ("horrible", -2.5),
    ("hug", 2.1),
    ("hurt", -2.4),
    ("hurting", -1.7),
    ("ill", -1.8),
    ("interesting", 1.7),
    ("joy", 2.8),
    ("joyful", 2.9),
    ("kill", -3.7),
    ("kiss", 1.8),
    ("laugh", 2.6),
    ("laughing", 2.2),
    ("like", 1.5),
    ("liked", 1.8),
    ("lonely", -1.5),
    ("lose", -1.6),
    ("lost", -1.3),
    ("love", 3.2),
    ("loved", 2.9),
    ("lovely", 2.8),
    ("mad", -2.2),
    ("mess", -1.5),
    ("miserable", -2.2),
    ("miss", -0.6),
    ("nervous", -1.1),
    ("nice", 1.8),
    ("nightmare", -2.5),
    ("ok", 1.2),
    ("okay", 0.9),
    ("overwhelmed", -1.5),
    ("pain", -2.3),
    ("painful", -1.9),
    ("panic", -2.3),
    ("peace", 2.5),
    ("peaceful", 2.2),
    ("perfect", 2.7),
    ("play", 1.4),
    ("pleasant", 2.3),
    ("please", 1.3),
    ("pleased", 1.9),
    ("positive", 2.6),
    ("pretty", 2.2),
    ("problem", -1.7),
    ("proud", 2.1),
    ("relax", 1.9),
    ("relaxed", 2.2),
    ("relief", 2.1),
    ("relieved", 1.5),
    ("rude", -2.0),
    ("sad", -2.1),
    ("sadness", -1.9),
    ("safe", 1.9),
    ("scare", -2.2),
    ("scared", -1.9),
    ("scary", -2.2),
    ("screaming", -1.6),
    ("shame", -2.1),
    ("shock", -1.6),
    ("sick", -2.3),
    ("smile", 1.5),
    ("smiling", 2.0),
    ("sorry", -0.3),
    ("strong", 2.3),
    ("stuck", -1.0),
    ("stupid", -2.4),
    ("success", 2.7),
    ("suffer", -2.5),
    ("super", 2.9),
    ("support", 1.7),
    ("sure", 1.3),
    ("sweet", 2.0),
    ("terrible", -2.1),
    ("terrified", -3.0),
    ("thank", 1.5),
    ("thanks", 1.9),
    ("threat", -2.4),
    ("tired", -1.9),
    ("trouble", -1.7),
    ("trust", 2.3),
    ("ugly", -2.3),
    ("unhappy", -1.8),
    ("upset", -1.6),
    ("useless", -1.8),
    ("warm", 0.9),
    ("weak", -1.9),
    ("weird", -0.7),
    ("welcome", 2.0),
    ("win", 2.8),
    ("wonderful", 2.7),
    ("worried", -1.2),
    ("worry", -1.9),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wow", 2.8),
    ("wrong", -2.1),
    ("yay", 2.4),
    ("yes", 1.7),
];

/// Intensifiers (positive) and dampeners (negative); they carry no valence of their own.
pub(crate) const BOOSTERS: &[(&str, f32)] = &[
    ("absolutely", 0.293),
    ("amazingly", 0.293),
    ("awfully", 0.293),
    ("completely", 0.293),
    ("deeply", 0.293),
    ("enormously", 0.293),
    ("entirely", 0.293),
    ("especially", 0.293),
    ("extremely", 0.293),
    ("fully", 0.293),
    ("greatly", 0.293),
    ("highly", 0.293),
    ("hugely", 0.293),
    ("incredibly", 0.293),
    ("intensely", 0.293),
    ("most", 0.293),
    ("particularly", 0.293),
    ("quite", 0.293),
    ("really", 0.293),
    ("remarkably", 0.293),
    ("so", 0.293),
    ("thoroughly", 0.293),
    ("totally", 0.293),
    ("tremendously", 0.293),
    ("truly", 0.293),
    ("unbelievably", 0.293),
    ("utterly", 0.293),
    ("very", 0.293),
    ("almost", -0.293),
    ("barely", -0.293),
    ("hardly", -0.293),
    ("kinda", -0.293),
    ("less", -0.293),
    ("little", -0.293),
    ("marginally", -0.293),
    ("occasionally", -0.293),
    ("partly", -0.293),
    ("scarcely", -0.293),
    ("slightly", -0.293),
    ("somewhat", -0.293),
    ("sorta", -0.293),
];

pub(crate) const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "dont", "hadnt",
    "hasnt", "havent", "isnt", "mightnt", "mustnt", "neither", "neednt", "never", "none", "nope",
    "nor", "not", "nothing", "nowhere", "oughtnt", "shant", "shouldnt", "wasnt", "werent",
    "without", "wont", "wouldnt", "rarely", "seldom", "despite",
];

/// English stop words, apostrophes removed.
pub(crate) const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "youre", "youve",
    "youll", "youd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "shes", "her", "hers", "herself", "it", "its", "itself", "they", "them", "their",
    "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "thatll", "these",
    "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "dont", "should", "shouldve", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "arent", "couldn", "couldnt", "didn",
    "didnt", "doesn", "doesnt", "hadn", "hadnt", "hasn", "hasnt", "haven", "havent", "isn",
    "isnt", "ma", "mightn", "mightnt", "mustn", "mustnt", "needn", "neednt", "shan", "shant",
    "shouldn", "shouldnt", "wasn", "wasnt", "weren", "werent", "won", "wont", "wouldn",
    "wouldnt",
];
