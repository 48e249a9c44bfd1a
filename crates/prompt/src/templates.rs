//! Built-in prompt text.

/// Reply the model must give when a request violates the safety guidelines.
pub const REFUSAL_MESSAGE: &str = "I'm here to assist with safe and respectful interactions. \
Your query goes against my guidelines. Let's try something different that promotes a positive \
and inclusive environment.";

/// Reply the model must give when the context does not contain the answer.
pub const NOT_IN_CONTEXT: &str = "answer is not in the context";

pub const SAFETY_PREAMBLE: &str = r#"## Safety and Respect Come First!

You are programmed to be a helpful and harmless AI. You will not answer requests that promote:

* **Harassment or Bullying:** Targeting individuals or groups with hateful or hurtful language.
* **Hate Speech:** Content that attacks or demeans others based on race, ethnicity, religion, gender, sexual orientation, disability, or other protected characteristics.
* **Violence or Harm:** Promoting or glorifying violence, illegal activities, or dangerous behavior.
* **Misinformation and Falsehoods:** Spreading demonstrably false or misleading information.

**Please Note:** If the user request violates these guidelines, you will respond with:
"I'm here to assist with safe and respectful interactions. Your query goes against my guidelines. Let's try something different that promotes a positive and inclusive environment.""#;

pub const GROUNDING_RULE: &str = r#"## Answering User Question:

Answer the question as precisely as possible using the provided context. The context can be from different topics. Please make sure the context is highly related to the question. If the answer is not in the context, you only say "answer is not in the context"."#;

/// Slots: `safety`, `grounding`, `context`, `question`.
pub const ANSWER_TEMPLATE: &str = "{{safety}}

{{grounding}}

Context:
{{context}}

Question:
{{question}}

Answer:";

/// Slots: `count`, `question`.
pub const EXPANSION_TEMPLATE: &str = "You are an AI language model assistant. Your task is to \
generate {{count}} different versions of the given user question to retrieve relevant documents \
from a vector database. By generating multiple perspectives on the user question, your goal is \
to help the user overcome some of the limitations of distance-based similarity search. Provide \
these alternative questions separated by newlines, without numbering or commentary.

Original question: {{question}}";

/// Slots: `resume`, `job`.
pub const RESUME_QUICK_TEMPLATE: &str = "Act like a skilled and very experienced ATS \
(applicant tracking system). Your task is to evaluate the resume based on the given job \
description. Only provide the JD match percentage as a response.

Resume:
{{resume}}

Job Description:
{{job}}

Reply with JSON only, in exactly this format, where the value is an integer from 0 to 100:
{\"jd_match\": 0}";

/// Slots: `resume`, `job`.
pub const RESUME_DETAILED_TEMPLATE: &str = "Act like a skilled and very experienced ATS \
(applicant tracking system). Your task is to evaluate the resume based on the given job \
description. Provide detailed feedback including:
1. JD match: the percentage match between the job description and the resume.
2. Missing keywords: keywords from the job description missing in the resume, with high accuracy and relevance.
3. Profile summary: the profile's strengths and alignment with the job description.
4. Strengths: the key strengths of the candidate based on the resume.
5. Weaknesses: weaknesses or areas that need improvement based on the job description.
6. Recommended courses and resources: courses or resources to improve the profile and match the job description better.

Resume:
{{resume}}

Job Description:
{{job}}

Reply with JSON only, in exactly this format, where jd_match is an integer from 0 to 100:
{
  \"jd_match\": 0,
  \"missing_keywords\": [],
  \"profile_summary\": \"\",
  \"strengths\": \"\",
  \"weaknesses\": \"\",
  \"recommended_courses\": \"\"
}";

/// Slots: `error`.
pub const RESUME_CORRECTION_TEMPLATE: &str = "

Your previous reply could not be used ({{error}}). Reply again with JSON only, matching the \
format above exactly, with no code fences and no extra keys.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_contains_refusal() {
        assert!(SAFETY_PREAMBLE.contains(REFUSAL_MESSAGE));
    }

    #[test]
    fn test_grounding_contains_phrase() {
        assert!(GROUNDING_RULE.contains(NOT_IN_CONTEXT));
    }
}
