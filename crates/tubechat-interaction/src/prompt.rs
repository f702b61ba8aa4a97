use tubechat_core::CombinedContext;

/// Builds the single-turn prompt sent to the model.
pub fn build_prompt(context: &CombinedContext, question: &str) -> String {
    let noun = if context.source_count == 1 {
        "video"
    } else {
        "videos"
    };
    format!(
        "You are analyzing the transcripts of {count} {noun}: {title}.\n\n\
         {text}\n\n\
         Question: {question}\n\n\
         Answer from the transcripts above. When a point comes from a specific \
         video, say which one (for example \"In VIDEO 2, ...\").",
        count = context.source_count,
        title = context.composite_title,
        text = context.merged_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(source_count: usize) -> CombinedContext {
        CombinedContext {
            composite_id: "a,b".to_string(),
            composite_title: "Intro, Deep dive".to_string(),
            merged_text: "VIDEO 1 (ID: a):\nfirst".to_string(),
            source_count,
        }
    }

    #[test]
    fn test_prompt_embeds_context_then_question() {
        let prompt = build_prompt(&context(2), "What differs?");

        assert!(prompt.starts_with("You are analyzing the transcripts of 2 videos: Intro, Deep dive."));
        let text_at = prompt.find("VIDEO 1 (ID: a):\nfirst").unwrap();
        let question_at = prompt.find("Question: What differs?").unwrap();
        assert!(text_at < question_at);
    }

    #[test]
    fn test_singular_noun_for_one_video() {
        assert!(build_prompt(&context(1), "q").contains("of 1 video:"));
    }
}
