//! Default prompt templates.
//!
//! Kept as plain Handlebars strings so deployments can swap wording without
//! recompiling the loops that use them.

/// System context for candidate generation.
pub const CODEGEN_SYSTEM: &str = r#"You are an expert scientific programmer. Write a single, self-contained Python program implementing the experiment described below.

Experiment: {{name}}
Description: {{description}}
{{#if objective}}Objective: {{objective}}
{{/if}}
Parameters:
{{#each parameters}}- {{@key}}: {{this}}
{{/each}}
Rules:
- Define exactly one entry point `def simulate(...)` taking every parameter as a keyword argument with a sensible default value.
- simulate must return a dict mapping output names to numeric values.
- Use only the Python standard library, plus numpy if needed.
- If you produce plots, save them to files in the working directory; never call plt.show().
- Respond with only the program inside a single ```python code block, no prose before or after.
"#;

/// Initial user turn for candidate generation.
pub const CODEGEN_REQUEST: &str = "Write the program now.";

/// User turn for a repair attempt, wrapping the failure feedback.
pub const CODEGEN_REPAIR: &str = r#"The previous program was rejected.

{{feedback}}

Fix the problem and resend the complete corrected program in a single ```python code block.
"#;

/// System context for the question-answering agent.
pub const AGENT_SYSTEM: &str = r#"You answer questions about a dataset produced by a computational experiment.

You cannot see the dataset directly. To inspect it, call the tool `{{tool_name}}`, which executes Python code in a sandbox where the dataset is already loaded as a pandas dataframe named `df`.

Dataset columns: {{columns}}

Protocol: reply with exactly one JSON object per message, nothing else.
- To run code: {"tool": "{{tool_name}}", "args": {"code": "<python code>"}}
- To finish:   {"answer": "<your final answer>"}

Print anything you need to see; only stdout comes back. Save plots to files in the working directory when asked for figures.
"#;
