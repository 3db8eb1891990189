//! Calculator tool — evaluates mathematical expressions.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, parentheses, decimals, and unary
//! negation.
//!
//! Triggers on free text containing an arithmetic-looking run such as
//! `"quanto é 2 + 2?"`: at least two numbers joined by a binary operator.

use async_trait::async_trait;
use ctxeng_core::error::ToolError;
use ctxeng_core::tool::{Tool, ToolOutput, ToolResult};
use tracing::debug;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression. Supports +, -, *, /, %, parentheses, and decimal numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The mathematical expression to evaluate, e.g. '(2 + 3) * 4'"
                }
            },
            "required": ["expression"]
        })
    }

    fn trigger(&self, input: &str) -> Option<serde_json::Value> {
        extract_expression(input).map(|expr| serde_json::json!({"expression": expr}))
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let expr = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments {
                tool_name: "calculator".into(),
                reason: "Missing 'expression' argument".into(),
            })?;

        debug!(expression = %expr, "Evaluating expression");
        let value = evaluate(expr).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "calculator".into(),
            reason: e.to_string(),
        })?;

        Ok(ToolOutput {
            output: format!("{} = {}", expr.trim(), format_number(value)),
            data: Some(serde_json::json!({"result": value})),
        })
    }
}

/// Format a number without a trailing `.0` for integers.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Find the first arithmetic-looking run in free text.
///
/// A run is a maximal stretch of digits, operators, parentheses, dots and
/// spaces. It qualifies when it tokenizes and holds at least two numbers
/// and one binary operator. Whether it *evaluates* is left to `execute`.
pub fn extract_expression(input: &str) -> Option<String> {
    let is_expr_char = |c: char| c.is_ascii_digit() || "+-*/%(). \t".contains(c);

    let mut runs = Vec::new();
    let mut current = String::new();
    for c in input.chars() {
        if is_expr_char(c) {
            current.push(c);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.into_iter()
        .map(|r| r.trim().trim_end_matches('.').trim().to_string())
        .find(|candidate| {
            let Ok(tokens) = tokenize(candidate) else {
                return false;
            };
            let numbers = tokens.iter().filter(|t| matches!(t, Token::Number(_))).count();
            let has_binary_op = tokens.windows(2).any(|w| {
                matches!(w[0], Token::Number(_) | Token::Close) && matches!(w[1], Token::Op(_))
            });
            numbers >= 2 && has_binary_op
        })
}

// ── Expression evaluator ──────────────────────────────────────────────────

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Unexpected character '{ch}' at byte {at}")]
    UnexpectedChar { ch: char, at: usize },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Expected closing parenthesis")]
    UnclosedParen,

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Nesting limit for parentheses and unary minus.
pub const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
///
/// Precedence climbing over `+ -` (lowest) and `* / %`; all binary
/// operators are left-associative and unary minus binds tightest.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: tokens.iter().peekable(),
        depth: 0,
    };
    let value = parser.expression(1)?;
    match parser.tokens.next() {
        None => Ok(value),
        Some(tok) => Err(EvalError::UnexpectedToken(format!("{tok:?}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 2,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, EvalError> {
        match self {
            BinOp::Add => Ok(lhs + rhs),
            BinOp::Sub => Ok(lhs - rhs),
            BinOp::Mul => Ok(lhs * rhs),
            BinOp::Div | BinOp::Rem if rhs == 0.0 => Err(EvalError::DivisionByZero),
            BinOp::Div => Ok(lhs / rhs),
            BinOp::Rem => Ok(lhs % rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(BinOp),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((at, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Op(BinOp::Add),
            '-' => Token::Op(BinOp::Sub),
            '*' => Token::Op(BinOp::Mul),
            '/' => Token::Op(BinOp::Div),
            '%' => Token::Op(BinOp::Rem),
            '(' => Token::Open,
            ')' => Token::Close,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = at + c.len_utf8();
                while let Some(&(i, d)) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                let literal = &input[at..end];
                let value = literal
                    .parse()
                    .map_err(|_| EvalError::InvalidNumber(literal.to_string()))?;
                Token::Number(value)
            }
            ch => return Err(EvalError::UnexpectedChar { ch, at }),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: std::iter::Peekable<std::slice::Iter<'a, Token>>,
    depth: usize,
}

impl Parser<'_> {
    /// Fold operators of at least `min_precedence` into one value.
    fn expression(&mut self, min_precedence: u8) -> Result<f64, EvalError> {
        let mut lhs = self.operand()?;
        while let Some(&&Token::Op(op)) = self.tokens.peek() {
            if op.precedence() < min_precedence {
                break;
            }
            self.tokens.next();
            let rhs = self.expression(op.precedence() + 1)?;
            lhs = op.apply(lhs, rhs)?;
        }
        Ok(lhs)
    }

    // operand = NUMBER | '-' operand | '(' expression ')'
    fn operand(&mut self) -> Result<f64, EvalError> {
        match self.tokens.next() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::Op(BinOp::Sub)) => self.nested(|p| Ok(-p.operand()?)),
            Some(Token::Open) => self.nested(|p| {
                let value = p.expression(1)?;
                match p.tokens.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(EvalError::UnclosedParen),
                }
            }),
            Some(tok) => Err(EvalError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<f64, EvalError>,
    ) -> Result<f64, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_addition() {
        assert_eq!(evaluate("2 + 3").unwrap(), 5.0);
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
    }

    #[test]
    fn parentheses() {
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn nested_parentheses() {
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn division() {
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
    }

    #[test]
    fn division_by_zero() {
        assert!(evaluate("1 / 0").is_err());
    }

    #[test]
    fn unary_negation() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
    }

    #[test]
    fn decimals() {
        assert_eq!(evaluate("3.14 * 2").unwrap(), 6.28);
    }

    #[test]
    fn complex_expression() {
        let result = evaluate("(10 + 5) / 3 - 2 * (1 + 1)").unwrap();
        assert!((result - 1.0).abs() < 1e-10);
    }

    #[test]
    fn invalid_expression() {
        assert!(evaluate("2 +").is_err());
    }

    #[test]
    fn empty_expression() {
        assert_eq!(evaluate(""), Err(EvalError::UnexpectedEnd));
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(evaluate("10 - 2 - 3").unwrap(), 5.0);
        assert_eq!(evaluate("64 / 4 / 2").unwrap(), 8.0);
    }

    #[test]
    fn remainder() {
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
        assert_eq!(evaluate("1 + 9 % 4 * 2").unwrap(), 3.0);
        assert_eq!(evaluate("5 % 0"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(evaluate("(1 + 2"), Err(EvalError::UnclosedParen));
        assert_eq!(evaluate("2 x 3"), Err(EvalError::UnexpectedChar { ch: 'x', at: 2 }));
        assert_eq!(evaluate("1..2 + 1"), Err(EvalError::InvalidNumber("1..2".into())));
        assert!(matches!(evaluate("2 3"), Err(EvalError::UnexpectedToken(_))));
    }

    #[test]
    fn nesting_limit() {
        let at_limit = format!("{}1 + 1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(evaluate(&at_limit).unwrap(), 2.0);

        let too_deep = format!("{}1 + 1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&too_deep), Err(EvalError::TooDeep));
        assert_eq!(evaluate(&format!("{}1", "-".repeat(10_000))), Err(EvalError::TooDeep));
    }

    #[test]
    fn trigger_on_arithmetic_text() {
        assert_eq!(extract_expression("quanto é 2 + 2?").as_deref(), Some("2 + 2"));
        assert_eq!(extract_expression("Qual o resultado de 8 * (2 + 3)?").as_deref(), Some("8 * (2 + 3)"));
        assert_eq!(extract_expression("2 + 2").as_deref(), Some("2 + 2"));
    }

    #[test]
    fn no_trigger_without_operator() {
        assert!(extract_expression("Qual é o dobro de 8?").is_none());
        assert!(extract_expression("o que é python").is_none());
        assert!(extract_expression("-5").is_none());
    }

    #[test]
    fn trigger_on_malformed_but_arithmetic_input() {
        // Matching is lexical; evaluation errors surface from execute.
        assert_eq!(extract_expression("calcule 1 / 0").as_deref(), Some("1 / 0"));
    }

    #[tokio::test]
    async fn tool_execute() {
        let tool = CalculatorTool;
        let result = tool
            .execute(serde_json::json!({"expression": "2 + 3"}))
            .await
            .unwrap();

        assert_eq!(result.output, "2 + 3 = 5");
        assert_eq!(result.data.unwrap()["result"], 5.0);
    }

    #[tokio::test]
    async fn tool_formats_integers() {
        let tool = CalculatorTool;
        let result = tool
            .execute(serde_json::json!({"expression": "10 / 2"}))
            .await
            .unwrap();

        assert_eq!(result.output, "10 / 2 = 5");
    }

    #[tokio::test]
    async fn tool_formats_decimals() {
        let tool = CalculatorTool;
        let result = tool
            .execute(serde_json::json!({"expression": "10 / 3"}))
            .await
            .unwrap();

        assert!(result.output.starts_with("10 / 3 = 3.333"));
    }

    #[tokio::test]
    async fn tool_reports_evaluation_failure() {
        let tool = CalculatorTool;
        let err = tool
            .execute(serde_json::json!({"expression": "1 / 0"}))
            .await
            .unwrap_err();
        assert_eq!(err.tool_name(), "calculator");
        assert_eq!(err.message(), "Division by zero");
    }

    #[tokio::test]
    async fn tool_missing_expression() {
        let tool = CalculatorTool;
        let result = tool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }

    #[test]
    fn tool_descriptor() {
        let tool = CalculatorTool;
        let def = tool.descriptor();
        assert_eq!(def.name, "calculator");
        assert_eq!(def.input_schema["required"][0], "expression");
    }
}
