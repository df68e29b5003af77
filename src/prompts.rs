//! Fixed prompt templates sent to the language model.

/// Placeholder stored when pseudocode generation fails
pub const PSEUDOCODE_UNAVAILABLE: &str = "Could not generate pseudocode";
/// Placeholder stored when explanation generation fails
pub const EXPLANATION_UNAVAILABLE: &str = "Could not generate explanation";

const PSEUDOCODE_TEMPLATE: &str = "\
Convert this COBOL code to well-structured pseudocode with these rules:
1. Use clear section headers with numbering (1. IDENTIFICATION, 2. DATA, 3. PROCEDURE)
2. Format variables as: [Variable Name] (Type: [type], Initial: [value])
3. Convert PERFORM to CALL/REPEAT, IF/ELSE to modern syntax
4. Add indentation (4 spaces) for nested logic
5. Replace COBOL syntax with plain English equivalents
6. Never use raw COBOL syntax in output

Example Output Format:
1. IDENTIFICATION:
   Program: [name]
   Author: [author]

2. DATA:
   Variables:
   - [name] (Type: [type], Initial: [value])

3. LOGIC:
   [step1]
      [substep]
   [step2]

COBOL Code:
";

const EXPLANATION_TEMPLATE: &str = "\
Explain this COBOL code with these formatting rules:
1. Never use markdown (** or *)
2. Use bold for key terms by writing them in ALL CAPS
3. Keep explanations concise (3-5 sentences)

COBOL Code:
";

pub fn pseudocode_prompt(code: &str) -> String {
    format!("{PSEUDOCODE_TEMPLATE}{code}")
}

pub fn explanation_prompt(code: &str) -> String {
    format!("{EXPLANATION_TEMPLATE}{code}")
}

/// Remove markdown emphasis the model emits despite being told not to.
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}
