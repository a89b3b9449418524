//! Prompt Catalog
//!
//! Static interviewing content: the base instruction block, per-position
//! technical question banks, and the shared behavioral and follow-up banks.
//! The catalog is an immutable value built once at startup and handed to
//! whoever needs it; it can be replaced from a JSON file without touching the
//! controller.

use crate::controller::ToolSpec;
use crate::error::InterviewError;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The position key used when a position has no dedicated question bank.
pub const DEFAULT_POSITION_KEY: &str = "software_engineer";

const BASE_INSTRUCTIONS: &str = "\
You are an AI interviewer conducting a professional job interview. Follow these guidelines:

1. INTRODUCTION PHASE:
- Welcome the candidate warmly
- Ask for their name and confirm the position they're applying for
- Brief overview of the interview process (15-20 minutes)
- Ask about their background and interest in the role

2. TECHNICAL PHASE:
- Ask 3-5 relevant technical questions based on their position
- Listen for depth of knowledge and problem-solving approach
- Ask follow-up questions for clarification
- Score responses on technical competency

3. BEHAVIORAL PHASE:
- Ask 3-4 behavioral questions using STAR method
- Focus on teamwork, leadership, problem-solving, and adaptability
- Evaluate communication skills and cultural fit

4. CLOSING PHASE:
- Summarize key points discussed
- Ask if candidate has questions
- Explain next steps in the process
- Thank them for their time

SCORING GUIDELINES:
- 5: Exceptional - Clear examples, deep understanding, excellent communication
- 4: Strong - Good examples, solid understanding, clear communication
- 3: Adequate - Basic understanding, meets minimum requirements
- 2: Below Average - Limited understanding, unclear responses
- 1: Poor - Inadequate knowledge, concerning responses

IMPORTANT RULES:
- Be conversational and professional
- Allow natural conversation flow
- Ask follow-up questions when needed
- Keep responses concise but thorough
- Use the provided functions to record information
- Maintain consistency in scoring criteria";

const GENERIC_GUIDANCE: &str = "\
GENERAL FOCUS:
Assess problem solving, communication, relevant experience and motivation for the role.
Tailor technical questions to the responsibilities the candidate describes.";

/// Question bank and assessment focus for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionProfile {
    pub technical: Vec<String>,
    pub skills_focus: Vec<String>,
}

/// Inputs for building the interviewer's system prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub position: &'a str,
    pub candidate_name: &'a str,
    pub company_name: Option<&'a str>,
    pub max_questions_per_phase: u32,
}

/// All static interviewing content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptCatalog {
    pub base_instructions: String,
    pub positions: BTreeMap<String, PositionProfile>,
    pub behavioral_questions: Vec<String>,
    pub follow_up_prompts: Vec<String>,
}

/// Normalizes a free-form position title into a catalog key:
/// `"Software Engineer"` becomes `"software_engineer"`.
pub fn position_key(position: &str) -> String {
    position.to_lowercase().replace(' ', "_")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn profile(technical: &[&str], skills_focus: &[&str]) -> PositionProfile {
    PositionProfile {
        technical: strings(technical),
        skills_focus: strings(skills_focus),
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        let mut positions = BTreeMap::new();
        positions.insert(
            "software_engineer".to_string(),
            profile(
                &[
                    "Describe your approach to debugging a complex issue in production",
                    "How would you design a system to handle 1 million concurrent users?",
                    "What's your experience with different programming paradigms?",
                    "Tell me about a challenging technical problem you solved recently",
                    "How do you ensure code quality and maintainability in your projects?",
                ],
                &["problem_solving", "system_design", "code_quality", "debugging", "scalability"],
            ),
        );
        positions.insert(
            "data_scientist".to_string(),
            profile(
                &[
                    "Walk me through your approach to a new machine learning project",
                    "How do you handle missing or inconsistent data in your datasets?",
                    "Explain the bias-variance tradeoff and how you manage it",
                    "What's your process for feature selection and engineering?",
                    "How do you validate and interpret your model results?",
                ],
                &[
                    "data_analysis",
                    "machine_learning",
                    "statistics",
                    "data_cleaning",
                    "model_validation",
                ],
            ),
        );
        positions.insert(
            "product_manager".to_string(),
            profile(
                &[
                    "How do you prioritize features when resources are limited?",
                    "Walk me through your process for gathering user requirements",
                    "How do you measure product success and user satisfaction?",
                    "Tell me about a product decision you had to make with incomplete information",
                    "How do you work with engineering teams to balance technical debt and new features?",
                ],
                &[
                    "prioritization",
                    "user_research",
                    "metrics",
                    "stakeholder_management",
                    "technical_understanding",
                ],
            ),
        );
        positions.insert(
            "designer".to_string(),
            profile(
                &[
                    "Walk me through your design process from concept to final product",
                    "How do you conduct user research and incorporate feedback?",
                    "Tell me about a design challenge where you had to balance user needs and business constraints",
                    "How do you ensure your designs are accessible to all users?",
                    "What's your approach to collaborating with developers during implementation?",
                ],
                &[
                    "design_process",
                    "user_research",
                    "accessibility",
                    "collaboration",
                    "problem_solving",
                ],
            ),
        );
        positions.insert(
            "marketing_manager".to_string(),
            profile(
                &[
                    "How do you develop and execute a go-to-market strategy?",
                    "What metrics do you use to measure campaign effectiveness?",
                    "Tell me about a time you had to pivot a marketing strategy based on data",
                    "How do you approach customer segmentation and targeting?",
                    "What's your experience with marketing automation and analytics tools?",
                ],
                &[
                    "strategy",
                    "analytics",
                    "customer_understanding",
                    "campaign_management",
                    "tools_proficiency",
                ],
            ),
        );

        Self {
            base_instructions: BASE_INSTRUCTIONS.to_string(),
            positions,
            behavioral_questions: strings(&[
                "Tell me about a time you had to work with a difficult team member. How did you handle it?",
                "Describe a situation where you had to learn something completely new in a short timeframe",
                "Give me an example of when you had to make a decision with incomplete information",
                "Tell me about a time you failed at something. What did you learn?",
                "Describe a situation where you had to convince someone to see things your way",
                "Tell me about a time you had to meet a very tight deadline. How did you prioritize?",
                "Give me an example of when you went above and beyond what was expected",
                "Describe a time when you had to give constructive feedback to a colleague",
                "Tell me about a project you're particularly proud of and your role in its success",
                "Describe a situation where you had to adapt to significant changes at work",
            ]),
            follow_up_prompts: strings(&[
                "Can you give me more specific details about that?",
                "What was the outcome of that situation?",
                "How did you measure success in that case?",
                "What would you do differently if faced with a similar situation?",
                "Can you walk me through your thought process?",
                "What challenges did you encounter during that process?",
                "How did others react to your approach?",
                "What did you learn from that experience?",
            ]),
        }
    }
}

impl PromptCatalog {
    /// Loads a catalog from a JSON file with the same shape as the built-in one.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InterviewError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| InterviewError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| InterviewError::CatalogParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The dedicated profile for `position`, if the catalog has one.
    pub fn profile_for(&self, position: &str) -> Option<&PositionProfile> {
        self.positions.get(&position_key(position))
    }

    /// Technical questions for `position`, falling back to the software
    /// engineer bank.
    pub fn technical_questions(&self, position: &str) -> &[String] {
        self.profile_for(position)
            .or_else(|| self.positions.get(DEFAULT_POSITION_KEY))
            .map(|profile| profile.technical.as_slice())
            .unwrap_or(&[])
    }

    /// A random sample of up to `count` distinct behavioral questions.
    pub fn behavioral_questions<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        self.behavioral_questions
            .choose_multiple(rng, count.min(self.behavioral_questions.len()))
            .cloned()
            .collect()
    }

    /// A random follow-up prompt, if the bank is not empty.
    pub fn follow_up_prompt<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.follow_up_prompts.choose(rng).map(String::as_str)
    }

    /// Builds the interviewer's system prompt. The output depends only on the
    /// inputs, never on randomness.
    pub fn system_prompt(&self, ctx: &PromptContext<'_>, tools: &[ToolSpec]) -> String {
        let company_info = ctx
            .company_name
            .filter(|name| !name.trim().is_empty())
            .map(|name| format!(" at {name}"))
            .unwrap_or_default();

        let focus = match self.profile_for(ctx.position) {
            Some(profile) => format!(
                "POSITION-SPECIFIC FOCUS for {}:\nKey skills to assess: {}\nPay special attention to their experience and knowledge in these areas.",
                ctx.position,
                profile.skills_focus.join(", ")
            ),
            None => GENERIC_GUIDANCE.to_string(),
        };

        let tool_lines: String = tools
            .iter()
            .map(|tool| format!("- {}() - {}\n", tool.name, tool.description))
            .collect();

        format!(
            "{base}\n\n{focus}\n\n\
             INTERVIEW CONTEXT:\n\
             - Candidate: {candidate}\n\
             - Position: {position}{company_info}\n\
             - Duration: Aim for 15-20 minutes total\n\
             - Questions: Ask at most {max_questions} questions per phase\n\
             - Current phase: Introduction (call advance_interview_phase() when a phase is done)\n\n\
             Remember to use the provided functions to:\n\
             {tool_lines}\n\
             Start with a warm welcome and introduction!",
            base = self.base_instructions,
            candidate = ctx.candidate_name,
            position = ctx.position,
            max_questions = ctx.max_questions_per_phase,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TOOL_CATALOG;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn ctx<'a>(position: &'a str, company_name: Option<&'a str>) -> PromptContext<'a> {
        PromptContext {
            position,
            candidate_name: "Ada",
            company_name,
            max_questions_per_phase: 5,
        }
    }

    #[test]
    fn test_position_key_normalization() {
        assert_eq!(position_key("Software Engineer"), "software_engineer");
        assert_eq!(position_key("DATA SCIENTIST"), "data_scientist");
        assert_eq!(position_key("designer"), "designer");
    }

    #[test]
    fn test_known_positions_get_specific_focus() {
        let catalog = PromptCatalog::default();
        for position in [
            "Software Engineer",
            "Data Scientist",
            "Product Manager",
            "Designer",
            "Marketing Manager",
        ] {
            let prompt = catalog.system_prompt(&ctx(position, None), TOOL_CATALOG);
            assert!(prompt.contains(&format!("POSITION-SPECIFIC FOCUS for {position}")));
            assert!(!prompt.contains("GENERAL FOCUS"));
        }
    }

    #[test]
    fn test_unknown_position_falls_back_to_generic_guidance() {
        let catalog = PromptCatalog::default();
        let prompt = catalog.system_prompt(&ctx("Chef", None), TOOL_CATALOG);
        assert!(prompt.contains("GENERAL FOCUS"));
        assert!(!prompt.contains("POSITION-SPECIFIC FOCUS"));
        assert_eq!(
            catalog.technical_questions("Chef"),
            catalog.technical_questions("Software Engineer")
        );
    }

    #[test]
    fn test_system_prompt_is_deterministic_and_lists_tools() {
        let catalog = PromptCatalog::default();
        let context = ctx("Designer", Some("Acme"));
        let prompt = catalog.system_prompt(&context, TOOL_CATALOG);
        assert_eq!(prompt, catalog.system_prompt(&context, TOOL_CATALOG));
        assert!(prompt.starts_with("You are an AI interviewer"));
        assert!(prompt.contains("- Position: Designer at Acme"));
        assert!(prompt.contains("- Candidate: Ada"));
        for tool in TOOL_CATALOG {
            assert!(prompt.contains(&format!("- {}() - {}", tool.name, tool.description)));
        }
    }

    #[test]
    fn test_blank_company_is_omitted() {
        let catalog = PromptCatalog::default();
        let prompt = catalog.system_prompt(&ctx("Designer", Some("  ")), TOOL_CATALOG);
        assert!(prompt.contains("- Position: Designer\n"));
    }

    #[test]
    fn test_behavioral_sample_is_distinct_and_capped() {
        let catalog = PromptCatalog::default();
        let mut rng = StdRng::seed_from_u64(7);

        let sample = catalog.behavioral_questions(5, &mut rng);
        assert_eq!(sample.len(), 5);
        assert_eq!(sample.iter().collect::<HashSet<_>>().len(), 5);
        assert!(sample.iter().all(|q| catalog.behavioral_questions.contains(q)));

        let all = catalog.behavioral_questions(50, &mut rng);
        assert_eq!(all.len(), catalog.behavioral_questions.len());
    }

    #[test]
    fn test_follow_up_prompt_comes_from_bank() {
        let catalog = PromptCatalog::default();
        let mut rng = StdRng::seed_from_u64(42);
        let prompt = catalog.follow_up_prompt(&mut rng).unwrap();
        assert!(catalog.follow_up_prompts.iter().any(|p| p == prompt));

        let empty = PromptCatalog {
            follow_up_prompts: vec![],
            ..PromptCatalog::default()
        };
        assert!(empty.follow_up_prompt(&mut rng).is_none());
    }

    #[test]
    fn test_catalog_loads_from_json_file() {
        let mut catalog = PromptCatalog::default();
        catalog.positions.insert(
            "chef".to_string(),
            PositionProfile {
                technical: vec!["How do you run a busy service?".to_string()],
                skills_focus: vec!["mise_en_place".to_string()],
            },
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&catalog).unwrap()).unwrap();

        let loaded = PromptCatalog::from_json_file(&path).unwrap();
        assert_eq!(loaded, catalog);
        assert_eq!(loaded.technical_questions("Chef").len(), 1);
    }

    #[test]
    fn test_catalog_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            PromptCatalog::from_json_file(&missing),
            Err(InterviewError::CatalogRead { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            PromptCatalog::from_json_file(&broken),
            Err(InterviewError::CatalogParse { .. })
        ));
    }
}
