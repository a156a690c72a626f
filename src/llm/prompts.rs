//! Fixed instruction templates sent to the generation backend.

pub const SUMMARY_INSTRUCTION: &str = "Summarize the document below for a professional reader.";
pub const COMPARISON_INSTRUCTION: &str = "Compare the two documents below, covering what they share and where they differ.";
pub const SUGGESTION_INSTRUCTION: &str = "Propose six follow-up questions a reader could ask about the document content below.";
pub const ANSWER_INSTRUCTION: &str = "Answer the question using only the content of the documents below.";

pub fn summary_prompt(text: &str) -> String {
    format!(
        "{}\n\
         Explain the main ideas and how the document is organised without leaving out \
         important points. Stay concise, objective and formal, and do not use emojis. \
         After the summary, list the key takeaways as bullet points.\n\n\
         {}",
        SUMMARY_INSTRUCTION, text
    )
}

pub fn comparison_prompt(name_a: &str, text_a: &str, name_b: &str, text_b: &str) -> String {
    format!(
        "{}\n\n\
         Document A - {}:\n\"\"\"{}\"\"\"\n\n\
         Document B - {}:\n\"\"\"{}\"\"\"\n\n\
         Structure the answer as follows:\n\
         State which file is Document A and which is Document B, using their full names.\n\
         Heading \"Similarities\": the themes, concepts, goals or structure they have in common.\n\
         Heading \"Differences\": a table with the columns Aspect, Document A - (short label) \
         and Document B - (short label), where each short label is a 3-5 word title for that \
         document's core topic.\n\
         Keep the tone formal and informative, without emojis.",
        COMPARISON_INSTRUCTION, name_a, text_a, name_b, text_b
    )
}

pub fn suggestions_prompt(corpus: &str, history: &str) -> String {
    format!(
        "{}\n\
         Three should be simple (factual or clarifying) and three complex (analytical, \
         inferential or open-ended). Output only the questions, one per line as bullet points, \
         with no introduction, no closing remarks and no difficulty labels.\n\n\
         Document:\n\"\"\"{}\"\"\"\n\n\
         Chat history:\n\"\"\"{}\"\"\"",
        SUGGESTION_INSTRUCTION, corpus, history
    )
}

pub fn answer_prompt(corpus: &str, question: &str) -> String {
    format!(
        "{}\n\n\
         Documents:\n\"\"\"{}\"\"\"\n\n\
         Question: {}",
        ANSWER_INSTRUCTION, corpus, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_lead_with_their_instruction() {
        assert!(summary_prompt("t").starts_with(SUMMARY_INSTRUCTION));
        assert!(comparison_prompt("a", "x", "b", "y").starts_with(COMPARISON_INSTRUCTION));
        assert!(suggestions_prompt("c", "h").starts_with(SUGGESTION_INSTRUCTION));
        assert!(answer_prompt("c", "q").starts_with(ANSWER_INSTRUCTION));
    }

    #[test]
    fn comparison_prompt_labels_both_documents_in_order() {
        let prompt = comparison_prompt("a.pdf", "alpha", "b.txt", "beta");
        let a = prompt.find("Document A - a.pdf").unwrap();
        let b = prompt.find("Document B - b.txt").unwrap();
        assert!(a < b);
        assert!(prompt.contains("\"\"\"alpha\"\"\""));
    }

    #[test]
    fn full_text_is_sent_untruncated() {
        let long = "word ".repeat(50_000);
        assert!(summary_prompt(&long).ends_with(&long));
    }
}
