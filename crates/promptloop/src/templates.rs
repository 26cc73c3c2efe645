// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Built-in prompt templates.
//!
//! Templates use `{slot}` markers filled by [`crate::placeholder::render`].
//! Every default can be replaced through [`PromptTemplates`]; only the tag
//! names the parsers look for are fixed.

use serde::{Deserialize, Serialize};

/// Short prompt-writing guide shown to the generator.
pub const DEFAULT_GUIDE: &str = "\
- State the task and the expected output format up front.
- Define every label the model may answer with, and answer with the label only.
- Put variable input inside clearly delimited sections.
- Give concrete decision rules for borderline cases.
- Keep the instruction concise; remove redundant wording.";

/// Generator meta-prompt: rewrite a seed instruction.
pub const DEFAULT_REWRITE: &str = "\
You are an instruction engineer. Your task is to rewrite the initial instruction in <instruction> xml tag based on the suggestions in the instruction guide in <guide> xml tag.

Instruction guide:
<guide>
{guide}
</guide>

Text wrapped in braces or in double angle brackets is customizable text that will be replaced at runtime. It must be kept exactly as is.
Write the rewrite in the same language as the initial instruction.

<instruction>
{initial}
</instruction>

Please only output the rewrite result.";

/// Generator meta-prompt: rewrite conditioned on the current best rewrite.
pub const DEFAULT_REWRITE_WITH_EXAMPLE: &str = "\
You are an instruction engineer. Your task is to rewrite the initial instruction in <instruction> xml tag based on the suggestions in the instruction guide in <guide> xml tag.

Instruction guide:
<guide>
{guide}
</guide>

Text wrapped in braces or in double angle brackets is customizable text that will be replaced at runtime. It must be kept exactly as is.
Write the rewrite in the same language as the initial instruction.
The rewrite in <example> xml tag scored well; produce a different rewrite that could score better.

<instruction>
{initial}
</instruction>

<example>
{demo}
</example>

Please only output the rewrite result.";

/// Critic template: analyze failures of the current prompt.
pub const DEFAULT_ERROR_ANALYSIS: &str = "\
You are an expert in analyzing classification prompts.
Task description:
{task_description}

Prompt under evaluation:
<prompt>
{prompt}
</prompt>

The prompt reached an accuracy of {accuracy}.
{confusion_matrix}

Failure cases (input, prediction and ground truth):
{failure_cases}

Identify the recurring error patterns, their likely causes in the prompt wording and what should change. Write the analysis inside <analysis></analysis> tags.";

/// Critic template: propose the next rewrite.
pub const DEFAULT_STEP: &str = "\
You are improving a prompt for a classification task.
Task description:
{task_description}

Earlier prompts and their scores, worst first:
{history}

Current prompt:
<prompt>
{original_instruction}
</prompt>

Error analysis of the current prompt:
<analysis>
{error_analysis}
</analysis>

Failure cases:
{failure_cases}

The answer must be exactly one of these labels: {labels}

Keep every runtime placeholder of the current prompt unchanged. Write the complete improved prompt inside <new_prompt></new_prompt> tags.";

/// Meta-prompt used to draft a prompt template from a task description.
pub const DEFAULT_METAPROMPT: &str = "\
You will write instructions for an eager but inexperienced assistant who needs careful guidance to complete a task.

The task is:
<Task>
{{TASK}}
</Task>

First list the input variables the instructions need inside <Inputs></Inputs> tags, one per line, written as {$VARIABLE_NAME}.
Then plan the structure of the instructions inside <Instructions Structure></Instructions Structure> tags.
Finally write the instructions inside <Instructions></Instructions> tags. Reference each variable exactly once by its {$VARIABLE_NAME} form, wrapped in an xml tag named after it.";

/// Judge template used by the built-in rater.
pub const DEFAULT_JUDGE: &str = "\
You are comparing rewrites of an instruction.

Original instruction:
<instruction>
{initial}
</instruction>

Each candidate below is shown together with the output it produced on the same demo input:
{candidates}

Pick the candidate whose output best fulfils the original instruction. Answer with the zero-based candidate index inside <best></best> tags.";

/// Template set passed to the oracle roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Prompt-writing guide
    pub guide: String,
    /// Generator rewrite
    pub rewrite: String,
    /// Generator rewrite with a worked example
    pub rewrite_with_example: String,
    /// Critic error analysis
    pub error_analysis: String,
    /// Critic rewrite step
    pub step: String,
    /// Meta-prompt drafting
    pub metaprompt: String,
    /// Rater judge
    pub judge: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            guide: DEFAULT_GUIDE.to_string(),
            rewrite: DEFAULT_REWRITE.to_string(),
            rewrite_with_example: DEFAULT_REWRITE_WITH_EXAMPLE.to_string(),
            error_analysis: DEFAULT_ERROR_ANALYSIS.to_string(),
            step: DEFAULT_STEP.to_string(),
            metaprompt: DEFAULT_METAPROMPT.to_string(),
            judge: DEFAULT_JUDGE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Replace the guide text.
    pub fn with_guide(mut self, guide: impl Into<String>) -> Self {
        self.guide = guide.into();
        self
    }
}
