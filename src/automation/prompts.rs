//! Prompt construction for each page category.

/// Characters of screen text sent by the people-search handler.
pub const PEOPLE_TEXT_LIMIT: usize = 2000;
/// Characters of screen text sent by the feed-post handler.
pub const FEED_TEXT_LIMIT: usize = 1000;
/// Characters of screen text sent by the profile-page handler.
pub const PROFILE_TEXT_LIMIT: usize = 1500;

/// First `max` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// General page analysis. Informational only; nothing branches on the answer.
pub fn page_analysis_prompt(text: &str, url: &str) -> String {
    let text = if text.trim().is_empty() {
        "No text detected"
    } else {
        text
    };
    format!(
        "You are a LinkedIn business-development assistant. Analyze the current page and \
         suggest one action.\n\n\
         Current page context: {text}\n\
         Current URL: {url}\n\n\
         Candidate actions:\n\
         1. Connect with people\n\
         2. Send messages\n\
         3. Like/comment on posts\n\
         4. Follow companies\n\
         5. Apply to jobs\n\
         6. Update profile\n\n\
         Return only the action number and a brief reason."
    )
}

pub fn people_search_prompt(text: &str) -> String {
    let page = truncate_chars(text, PEOPLE_TEXT_LIMIT);
    format!(
        "Analyze this LinkedIn people-search results page and identify people worth \
         connecting with for business reasons.\n\n\
         Page content: {page}\n\n\
         Return ONLY a JSON array, each item shaped as:\n\
         {{\"name\": \"their name\", \"title\": \"their job title\", \"reason\": \"why we should connect\"}}\n\n\
         Only suggest connections that make business sense. Return [] if none do."
    )
}

pub fn feed_post_prompt(text: &str) -> String {
    let post = truncate_chars(text, FEED_TEXT_LIMIT);
    format!(
        "Decide whether this LinkedIn post is worth liking.\n\n\
         Post content: {post}\n\n\
         Return LIKE only if the post is genuinely valuable for business development, \
         networking, or the industry. Return SKIP for anything irrelevant, promotional, \
         spammy, or inappropriate. Be conservative: when unsure, SKIP.\n\n\
         Reply with exactly one word: LIKE or SKIP."
    )
}

pub fn profile_prompt(text: &str) -> String {
    let profile = truncate_chars(text, PROFILE_TEXT_LIMIT);
    format!(
        "Analyze this LinkedIn profile and decide whether connecting makes business sense.\n\n\
         Profile content: {profile}\n\n\
         Return ONLY a JSON object:\n\
         {{\"shouldConnect\": true or false, \"reason\": \"one sentence\", \"message\": \"optional short personalized connection note\"}}\n\n\
         Omit \"message\" when shouldConnect is false."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn people_prompt_truncates_to_2000_chars() {
        let text = format!("{}{}", "a".repeat(2000), "OVERFLOW");
        let prompt = people_search_prompt(&text);
        assert!(prompt.contains(&"a".repeat(2000)));
        assert!(!prompt.contains("OVERFLOW"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn feed_prompt_truncates_to_1000_chars_and_is_conservative() {
        let text = format!("{}{}", "b".repeat(1000), "OVERFLOW");
        let prompt = feed_post_prompt(&text);
        assert!(!prompt.contains("OVERFLOW"));
        assert!(prompt.contains("LIKE or SKIP"));
        assert!(prompt.contains("conservative"));
    }

    #[test]
    fn profile_prompt_truncates_to_1500_chars() {
        let text = format!("{}{}", "c".repeat(1500), "OVERFLOW");
        let prompt = profile_prompt(&text);
        assert!(!prompt.contains("OVERFLOW"));
        assert!(prompt.contains("shouldConnect"));
    }

    #[test]
    fn analysis_prompt_lists_actions_and_url() {
        let prompt = page_analysis_prompt("", "https://www.linkedin.com/feed/");
        assert!(prompt.contains("No text detected"));
        assert!(prompt.contains("https://www.linkedin.com/feed/"));
        assert!(prompt.contains("Apply to jobs"));
    }
}
