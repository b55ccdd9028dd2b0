//! Fixed stop-word table applied during tokenization.

/// High-frequency function words stripped from the token stream. Covers the
/// Chinese set inherited from the upstream corpus plus common English
/// fillers. Matching is exact, after lowercasing.
const STOP_WORDS: &[&str] = &[
    // Chinese
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一",
    "一个", "上", "也", "很", "到", "说", "要", "去", "你", "会", "着",
    "没有", "看", "好", "自己", "这",
    // English
    "the", "and", "for", "are", "was", "with", "that", "this", "from",
    "have", "has", "had", "not", "but", "you", "all", "can", "will", "his",
    "her", "its", "our", "out", "one", "they", "them", "then", "than",
    "what", "when", "which", "were", "been", "also", "into", "over",
    "very", "just", "about", "is", "as", "at", "by", "of", "on", "or",
    "to", "in", "it", "be", "an", "we", "no", "so", "up", "do",
];

pub(crate) fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}
