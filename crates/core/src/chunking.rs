/// Split cleaned text into chunks of at most `max_chars` characters.
///
/// The packer is greedy and word-atomic: words are appended (joined by
/// a single space) until the next word would overflow the budget, at
/// which point the current chunk is sealed and a new one begins. Words
/// are never split, so a single word longer than `max_chars` becomes a
/// chunk of its own rather than being dropped or cut.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();

        if current_chars == 0 {
            current.push_str(word);
            current_chars = word_chars;
        } else if current_chars + 1 + word_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_chars = word_chars;
        } else {
            current.push(' ');
            current.push_str(word);
            current_chars += 1 + word_chars;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
