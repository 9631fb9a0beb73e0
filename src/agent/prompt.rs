//! Prompt text and history entry formats.

use crate::constants::PAINT_RECTANGLE;
use crate::error::AgentError;
use crate::tools::{Arguments, ToolCatalog, ToolOutput};

/// Builds the static system prompt: framing, the numbered tool catalog,
/// canvas geometry, the one-line response grammar, and examples.
pub fn system_prompt(catalog: &ToolCatalog) -> String {
    let (x1, y1, x2, y2) = PAINT_RECTANGLE;
    let tools = if catalog.is_empty() {
        "(no tools available)".to_string()
    } else {
        catalog.render()
    };

    format!(
        "You are a math agent with painting skills solving problems in iterations. \
You have access to various mathematical tools.
You also have access to a MSPaint application to draw and add your solution to the canvas.

Available tools:
{tools}

MSPaint Application information:
Rectangle co-ordinates: x1 = {x1}, y1 = {y1}, x2 = {x2}, y2 = {y2}

You must respond with EXACTLY ONE line in one of these formats (no additional text):
1. For function calls:
FUNCTION_CALL: function_name|param1|param2|...

2. For final answers:
FINAL_ANSWER: number

3. For drawing in Paint:
USE_PAINT: function_name|param1|param2|...

4. For completing the task:
COMPLETE_RUN

Important:
- When a function returns multiple values, you need to process all of them
- Only give FINAL_ANSWER when you have completed all necessary calculations
- Only USE_PAINT when you are ready to draw in Paint with the FINAL_ANSWER
- Using paint steps:
    - First start the paint application by calling open_paint
    - Then draw a rectangle using draw_rectangle giving correct parameters
    - Finally add text using add_text_in_paint with the FINAL_ANSWER: number as text
    - You must call these functions in the correct order
- Do not include multiple responses. Give ONE response at a time.
- Do not repeat function calls with the same parameters
- After you have completed the task, you can call COMPLETE_RUN to end the program

Examples:
- FUNCTION_CALL: add|5|3
- FUNCTION_CALL: strings_to_chars_to_int|INDIA
- FINAL_ANSWER: 42
- USE_PAINT: draw_rectangle|{x1}|{y1}|{x2}|{y2}
- COMPLETE_RUN

DO NOT include any explanations or additional text.
Your entire response should be a single line starting with either \
FUNCTION_CALL: or FINAL_ANSWER: or USE_PAINT: or COMPLETE_RUN"
    )
}

/// Full prompt for one generation call.
pub fn compose(system_prompt: &str, query: &str) -> String {
    format!("{system_prompt}\n\nQuery: {query}")
}

pub fn call_entry(iteration: usize, tool: &str, args: &Arguments, output: &ToolOutput) -> String {
    format!(
        "In the {iteration} iteration you called {tool} with {args} parameters, \
and the function returned {output}."
    )
}

pub fn final_answer_entry(iteration: usize, line: &str) -> String {
    let (x1, y1, x2, y2) = PAINT_RECTANGLE;
    format!(
        "In the {iteration} iteration you completed calculations with {line}. \
Now call the paint tools starting with USE_PAINT: open_paint, \
then draw_rectangle with the rectangle co-ordinates {x1}|{y1}|{x2}|{y2}, \
followed by add_text_in_paint with the {line} as text."
    )
}

pub fn error_entry(iteration: usize, err: &AgentError) -> String {
    format!("Error in iteration {iteration}: {err}")
}
