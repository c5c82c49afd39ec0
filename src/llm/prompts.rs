use crate::models::StageId;

/// Agent persona that becomes the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

pub const REVIEWER: Persona = Persona {
    role: "Java Code Reviewer",
    goal: "Review legacy Java code and generate clear documentation in Markdown format, \
           highlighting any limitations or outdated patterns, plus any other important points.",
    backstory: "An expert Java developer responsible for reviewing legacy code and writing \
                detailed, easy-to-understand documentation that other developers use to \
                rebuild it as modern code.",
};

pub const VALIDATOR: Persona = Persona {
    role: "Documentation Validator",
    goal: "Validate and improve Java documentation so it is accurate, complete, and follows \
           modern standards.",
    backstory: "A senior Java software engineer who makes sure all technical documentation is \
                clear, detailed and professional.",
};

pub const REFACTORER: Persona = Persona {
    role: "Modern Java Developer",
    goal: "Write modern, clean, and efficient Java 17+ code based on validated documentation.",
    backstory: "An experienced developer who specializes in rebuilding legacy code as modern \
                Java applications, focusing on best practices, readability, and performance.",
};

pub fn persona(stage: StageId) -> &'static Persona {
    match stage {
        StageId::Review => &REVIEWER,
        StageId::Validate => &VALIDATOR,
        StageId::Refactor => &REFACTORER,
    }
}

/// Instruction template for one stage: what to do and what shape of answer is wanted
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTemplate {
    pub description: String,
    pub expected_output: &'static str,
}

const REVIEW_EXPECTED: &str = "A comprehensive Markdown document containing the code \
    explanation, a list of limitations, and a summary of outdated patterns, plus any other \
    important points.";

const VALIDATE_EXPECTED: &str = "An improved and complete version of the Java code \
    documentation in Markdown format. The final output should be ready for a developer to use \
    for refactoring.";

const REFACTOR_EXPECTED: &str = "A single, complete, and clean Java code block containing the \
    modern refactored code.";

/// Reviewer task: the source is embedded verbatim inside a java block
pub fn review_task(code: &str) -> TaskTemplate {
    let mut description = String::new();
    description.push_str("Generate detailed documentation in Markdown for the following Java code.\n");
    description.push_str("Analyze the code, explain its functionality, identify potential limitations,\n");
    description.push_str("and point out any outdated Java patterns.\n\n");
    description.push_str("---\nCODE:\n```java\n");
    description.push_str(code);
    description.push_str("\n```\n");

    TaskTemplate {
        description,
        expected_output: REVIEW_EXPECTED,
    }
}

/// Validator task over the reviewer's documentation
pub fn validation_task(documentation: &str) -> TaskTemplate {
    let mut description = String::new();
    description.push_str("Review, validate, and improve the following documentation.\n");
    description.push_str("Ensure it is accurate, complete, and follows modern technical documentation standards.\n");
    description.push_str("Add any missing details and clarify complex points.\n\n");
    description.push_str("---\nDOCUMENTATION:\n");
    description.push_str(documentation);
    description.push('\n');

    TaskTemplate {
        description,
        expected_output: VALIDATE_EXPECTED,
    }
}

/// Refactorer task over the validated documentation
pub fn refactor_task(documentation: &str) -> TaskTemplate {
    let mut description = String::new();
    description.push_str("Generate clean, modern Java 17+ code based on the final documentation provided.\n");
    description.push_str("The code should be complete, runnable, and enclosed in a single markdown code block.\n");
    description.push_str("Do not include any explanations or text outside the ```java ... ``` block.\n\n");
    description.push_str("---\nFINAL DOCUMENTATION:\n");
    description.push_str(documentation);
    description.push('\n');

    TaskTemplate {
        description,
        expected_output: REFACTOR_EXPECTED,
    }
}

/// Task template for `stage` over its input text
pub fn stage_task(stage: StageId, input: &str) -> TaskTemplate {
    match stage {
        StageId::Review => review_task(input),
        StageId::Validate => validation_task(input),
        StageId::Refactor => refactor_task(input),
    }
}

/// System prompt for a persona
pub fn build_system_prompt(persona: &Persona) -> String {
    format!(
        "You are {}. {}\nYour personal goal is: {}",
        persona.role, persona.backstory, persona.goal
    )
}

/// User prompt for a task
pub fn build_task_prompt(task: &TaskTemplate) -> String {
    let mut prompt = String::new();
    prompt.push_str("# Current Task\n");
    prompt.push_str(&task.description);
    prompt.push_str("\n# Expected Output\n");
    prompt.push_str(task.expected_output);
    prompt.push_str("\nReturn the actual complete content as your final answer, not a summary.\n");
    prompt
}
