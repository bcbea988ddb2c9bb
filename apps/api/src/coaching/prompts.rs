// Prompt constants and builders for the coaching endpoints.
// Placeholders use `{name}` and are filled by the builders below, never by callers.

/// Context excerpts longer than this are cut before they reach the chat prompt.
pub const CHAT_CONTEXT_CHARS: usize = 600;
/// Mock interviews get a little more of the JD and resume.
pub const INTERVIEW_CONTEXT_CHARS: usize = 800;
/// JD excerpt included in a job-intel request.
pub const JOB_INTEL_JD_CHARS: usize = 500;

const NOT_PROVIDED: &str = "Not provided";

pub const OPTIMIZE_RESUME_SYSTEM: &str = "\
You are a professional resume consultant who specialises in tailoring a candidate's resume \
to a specific job.

Your task:
1. Analyse the job description (JD) for its core requirements, keywords and competency model
2. Compare the candidate's resume against it and find matches and areas to strengthen
3. Rephrase relevant experience and achievements in the JD's own vocabulary
4. Highlight the skills and experience most relevant to the role
5. Use quantified results wherever the resume supports them

Output format:
- First, **Match analysis**: the JD's core requirements versus what the resume already shows
- Then, **Optimisation suggestions**: rewrite advice for each resume section (experience, projects, skills)
- Finally, **Optimised resume excerpts**: rewritten versions ready to paste

Style: professional, concise and forceful, in the idiom of the role's industry.";

const OPTIMIZE_RESUME_USER_TEMPLATE: &str = "\
Target company: {company}

[Job description]
{jd}

[Current resume]
{resume}

Please optimise my resume so it matches this role as closely as possible.";

pub const INTERVIEW_QUESTIONS_SYSTEM: &str = "\
You are a senior technical interviewer and HR specialist with extensive experience writing \
interview questions. From a job description and a candidate's background you predict the \
questions most likely to come up and explain how to approach each one.";

const INTERVIEW_QUESTIONS_USER_TEMPLATE: &str = "\
Target company: {company}

[Job description]
{jd}

[Candidate resume]
{resume}

Produce a complete interview preparation bank in this format:

## Technical / domain questions (8-10)
Questions on the role's core skills, each with:
- The question
- What it assesses
- Hints for a strong answer

## Behavioural questions (5-6)
STAR-style questions, each with:
- The question
- The soft skill it probes
- Which resume experiences to draw on

## Situational questions (3-4)
Hypothetical scenarios testing practical judgement

## Questions to ask the interviewer
3-5 thoughtful questions that show real insight into the company and role

Keep every question practical and specific to this role.";

const NO_RESUME_FALLBACK: &str = "No resume provided; generate general questions from the JD";

const MOCK_INTERVIEW_SYSTEM_TEMPLATE: &str = "\
You are a strict but fair interviewer conducting an interview with a candidate.

Interview context:
- Target company: {company}
- Job description: {jd}
- Candidate resume: {resume}

How to run the interview:
1. Keep a professional, natural conversational tone
2. Follow up on the candidate's answers and dig into the details
3. Introduce new questions at the right moments, alternating technical, behavioural and situational
4. Give brief feedback on each answer: acknowledge strengths, probe weaknesses
5. Keep the pace steady and never ask too many questions at once

Open by introducing yourself and asking the first question.
If the candidate says \"end interview\", give an overall assessment and concrete advice for improvement.";

const CHAT_SYSTEM_TEMPLATE: &str = "\
You are a professional career-coaching assistant.

Current job-search context:
- Target company: {company}
- Job description: {jd}
- User resume: {resume}

Help the user with any question about the role, the company, their resume or interviews, \
in a free-form conversation. Keep replies concise and to the point.";

pub const JOB_INTEL_SYSTEM: &str = "\
You are a professional workplace-intelligence analyst who distils information about a company \
into insights that matter to a job seeker. Your analysis is objective, practical and \
insightful, and helps the candidate prepare thoroughly before the interview.";

const JOB_INTEL_USER_TEMPLATE: &str = "\
Target company: {company}
Target role: {jd}

Produce a complete **company intelligence report** with these sections:

## Company overview
(size, market position, recent developments)

## Employee reputation
(pay and benefits, workload, management style, pros and cons)

## Interview intelligence
(process, common question types, things to watch out for)

## Company culture
(team atmosphere, values, growth opportunities)

## Job-seeking advice
(interview strategy for this company, what to prepare most)

Where information is thin, say \"limited information\" and give a reasoned inference.";

/// Appended to a system prompt when the user wants a reply in a language
/// other than English. Unknown codes fall back to English.
pub fn language_instruction(language: Option<&str>) -> String {
    let Some(code) = language.map(str::trim).filter(|c| !c.is_empty() && *c != "en") else {
        return String::new();
    };

    let name = match code {
        "zh" => "Simplified Chinese",
        "tw" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "ar" => "Arabic",
        _ => "English",
    };

    format!("\n\nIMPORTANT: You must respond entirely in {name}. Do not use any other language.")
}

/// Cuts `text` to at most `max_chars` characters, on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn or_not_provided(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(NOT_PROVIDED)
}

/// Substitutes `{name}` placeholders in a single scan, so user text that
/// happens to contain a placeholder is copied through literally.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let matched = values.iter().find(|(name, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .is_some_and(|t| t.starts_with('}'))
        });
        match matched {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn with_language(system: &str, language: Option<&str>) -> String {
    format!("{system}{}", language_instruction(language))
}

pub fn optimize_resume_system(language: Option<&str>) -> String {
    with_language(OPTIMIZE_RESUME_SYSTEM, language)
}

pub fn optimize_resume_message(company: Option<&str>, jd: &str, resume: &str) -> String {
    fill(
        OPTIMIZE_RESUME_USER_TEMPLATE,
        &[("company", or_not_provided(company)), ("jd", jd), ("resume", resume)],
    )
}

pub fn interview_questions_system(language: Option<&str>) -> String {
    with_language(INTERVIEW_QUESTIONS_SYSTEM, language)
}

pub fn interview_questions_message(company: Option<&str>, jd: &str, resume: Option<&str>) -> String {
    let resume = resume
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(NO_RESUME_FALLBACK);
    fill(
        INTERVIEW_QUESTIONS_USER_TEMPLATE,
        &[("company", or_not_provided(company)), ("jd", jd), ("resume", resume)],
    )
}

/// Shared shape of the two conversational system prompts.
fn conversational_system(
    template: &str,
    company: Option<&str>,
    jd: Option<&str>,
    resume: Option<&str>,
    max_chars: usize,
    language: Option<&str>,
) -> String {
    let system = fill(
        template,
        &[
            ("company", or_not_provided(company)),
            ("jd", excerpt(or_not_provided(jd), max_chars)),
            ("resume", excerpt(or_not_provided(resume), max_chars)),
        ],
    );
    with_language(&system, language)
}

pub fn mock_interview_system(
    company: Option<&str>,
    jd: Option<&str>,
    resume: Option<&str>,
    language: Option<&str>,
) -> String {
    conversational_system(
        MOCK_INTERVIEW_SYSTEM_TEMPLATE,
        company,
        jd,
        resume,
        INTERVIEW_CONTEXT_CHARS,
        language,
    )
}

pub fn chat_system(
    company: Option<&str>,
    jd: Option<&str>,
    resume: Option<&str>,
    language: Option<&str>,
) -> String {
    conversational_system(
        CHAT_SYSTEM_TEMPLATE,
        company,
        jd,
        resume,
        CHAT_CONTEXT_CHARS,
        language,
    )
}

pub fn job_intel_system(language: Option<&str>) -> String {
    with_language(JOB_INTEL_SYSTEM, language)
}

pub fn job_intel_message(company: &str, jd: Option<&str>) -> String {
    fill(
        JOB_INTEL_USER_TEMPLATE,
        &[
            ("company", company),
            ("jd", excerpt(or_not_provided(jd), JOB_INTEL_JD_CHARS)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_in_user_text_are_kept_literally() {
        let message = optimize_resume_message(None, "Requirements: see {resume}", "MY CV {jd}");
        assert!(message.contains("Requirements: see {resume}"));
        assert!(message.contains("MY CV {jd}"));
        assert_eq!(message.matches("MY CV").count(), 1);
    }

    #[test]
    fn test_fill_leaves_unknown_braces_alone() {
        assert_eq!(fill("{a} {b} {", &[("a", "x{a}")]), "x{a} {b} {");
    }

    #[test]
    fn test_english_needs_no_instruction() {
        assert_eq!(language_instruction(None), "");
        assert_eq!(language_instruction(Some("en")), "");
        assert_eq!(language_instruction(Some("")), "");
    }

    #[test]
    fn test_known_language_instruction() {
        let instruction = language_instruction(Some("ja"));
        assert!(instruction.contains("respond entirely in Japanese"));
        assert!(instruction.starts_with("\n\n"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert!(language_instruction(Some("xx")).contains("respond entirely in English"));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("简历优化", 2), "简历");
        assert_eq!(excerpt("short", 100), "short");
        assert_eq!(excerpt("abc", 3), "abc");
    }

    #[test]
    fn test_chat_system_truncates_context() {
        let long_jd = "x".repeat(CHAT_CONTEXT_CHARS + 50);
        let system = chat_system(Some("Acme"), Some(&long_jd), None, None);
        assert!(system.contains("Target company: Acme"));
        assert!(system.contains(&"x".repeat(CHAT_CONTEXT_CHARS)));
        assert!(!system.contains(&"x".repeat(CHAT_CONTEXT_CHARS + 1)));
        assert!(system.contains("User resume: Not provided"));
    }

    #[test]
    fn test_mock_interview_allows_longer_context() {
        let jd = "y".repeat(INTERVIEW_CONTEXT_CHARS);
        let system = mock_interview_system(None, Some(&jd), Some("Rust dev"), Some("de"));
        assert!(system.contains(&jd));
        assert!(system.contains("Candidate resume: Rust dev"));
        assert!(system.ends_with("Do not use any other language."));
    }

    #[test]
    fn test_interview_questions_without_resume() {
        let message = interview_questions_message(None, "Senior Rust engineer", Some("  "));
        assert!(message.contains(NO_RESUME_FALLBACK));
        assert!(message.contains("Target company: Not provided"));
    }

    #[test]
    fn test_optimize_resume_message_embeds_inputs() {
        let message = optimize_resume_message(Some("Initech"), "JD text", "Resume text");
        assert!(message.contains("Target company: Initech"));
        assert!(message.contains("[Job description]\nJD text"));
        assert!(message.contains("[Current resume]\nResume text"));
    }
}
