//! Expression parser for two-operand column formulas.
//!
//! This module implements a recursive descent parser over a closed grammar.
//! Expressions can only compute: there are no statements, no attribute
//! access and no identifiers beyond the two operands, `pi` and a small
//! set of unary functions. Anything else is rejected as a syntax error.
//!
//! # BNF Grammar
//!
//! ```bnf
//! Expression     ::= Addition
//! Addition       ::= Multiplication ( ( "+" | "-" ) Multiplication )*
//! Multiplication ::= Unary ( ( "*" | "/" ) Unary )*
//! Unary          ::= ( "+" | "-" ) Unary | Power
//! Power          ::= Primary ( "**" Unary )?
//! Primary        ::= Number | Operand | "pi" | Function "(" Expression ")" | "(" Expression ")"
//! Operand        ::= "A" | "B"
//! Function       ::= "sin" | "cos" | "tan" | "sqrt" | "ln" | "log10"
//! Number         ::= [0-9]* ( "." [0-9]* )? ( [eE] [+-]? [0-9]+ )?
//! ```
//!
//! Identifiers are case-insensitive. `**` binds tighter than unary minus on
//! its left and is right-associative, so `-2 ** 2` is `-4` and
//! `2 ** 3 ** 2` is `512`.

use super::errors::{EvalError, EvalResult};

/// Represents a token in the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Identifier(String),

    Plus,
    Minus,
    Multiply,
    Divide,
    Power,

    LeftParen,
    RightParen,

    Eof,
}

/// One of the two named inputs of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
}

/// The allow-listed unary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Sqrt,
    Ln,
    Log10,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "SIN" => Some(Function::Sin),
            "COS" => Some(Function::Cos),
            "TAN" => Some(Function::Tan),
            "SQRT" => Some(Function::Sqrt),
            "LN" => Some(Function::Ln),
            "LOG10" => Some(Function::Log10),
            _ => None,
        }
    }

    fn apply(self, x: f64) -> EvalResult<f64> {
        match self {
            Function::Sin => Ok(x.sin()),
            Function::Cos => Ok(x.cos()),
            Function::Tan => Ok(x.tan()),
            Function::Sqrt if x < 0.0 => {
                Err(EvalError::DomainError("square root of a negative number".to_string()))
            }
            Function::Sqrt => Ok(x.sqrt()),
            Function::Ln | Function::Log10 if x <= 0.0 => {
                Err(EvalError::DomainError("logarithm of a non-positive number".to_string()))
            }
            Function::Ln => Ok(x.ln()),
            Function::Log10 => Ok(x.log10()),
        }
    }
}

/// Represents an Abstract Syntax Tree node for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Operand(Operand),

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },

    FunctionCall {
        function: Function,
        arg: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

fn syntax(message: impl Into<String>) -> EvalError {
    EvalError::Syntax(message.into())
}

/// Lexical analyzer for tokenizing expressions.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_digits(&mut self, into: &mut String) {
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                into.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads a decimal literal with optional fraction and exponent.
    fn read_number(&mut self) -> EvalResult<f64> {
        let mut number_str = String::new();

        self.read_digits(&mut number_str);

        if self.current_char == Some('.') {
            number_str.push('.');
            self.advance();
            self.read_digits(&mut number_str);
        }

        // Only treat `e` as an exponent when digits follow, so `2e` fails
        // as an unknown trailing identifier rather than a bad number.
        if matches!(self.current_char, Some('e') | Some('E')) {
            let has_exponent = match self.peek(1) {
                Some(d) if d.is_ascii_digit() => true,
                Some('+') | Some('-') => self.peek(2).is_some_and(|d| d.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                number_str.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char {
                    number_str.push(sign);
                    self.advance();
                }
                self.read_digits(&mut number_str);
            }
        }

        number_str
            .parse::<f64>()
            .map_err(|_| syntax(format!("invalid number '{}'", number_str)))
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                identifier.push(ch.to_ascii_uppercase());
                self.advance();
            } else {
                break;
            }
        }

        identifier
    }

    pub fn next_token(&mut self) -> EvalResult<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char else {
            return Ok(Token::Eof);
        };

        match ch {
            '0'..='9' | '.' => Ok(Token::Number(self.read_number()?)),

            'A'..='Z' | 'a'..='z' | '_' => Ok(Token::Identifier(self.read_identifier())),

            '+' => {
                self.advance();
                Ok(Token::Plus)
            }

            '-' => {
                self.advance();
                Ok(Token::Minus)
            }

            '*' => {
                self.advance();
                if self.current_char == Some('*') {
                    self.advance();
                    Ok(Token::Power)
                } else {
                    Ok(Token::Multiply)
                }
            }

            '/' => {
                self.advance();
                Ok(Token::Divide)
            }

            '(' => {
                self.advance();
                Ok(Token::LeftParen)
            }

            ')' => {
                self.advance();
                Ok(Token::RightParen)
            }

            _ => Err(syntax(format!("unexpected character '{}'", ch))),
        }
    }
}

/// Deepest expression tree the parser will build.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Recursive descent parser for formula expressions.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> EvalResult<Self> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            current_token,
            depth: 0,
        })
    }

    /// Counts one more level of tree depth, failing past the limit. Callers
    /// undo it with `leave` once the nested node is built.
    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(syntax("expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn advance(&mut self) -> EvalResult<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> EvalResult<()> {
        if self.current_token == expected {
            self.advance()
        } else {
            Err(syntax(format!(
                "expected {:?}, found {:?}",
                expected, self.current_token
            )))
        }
    }

    /// Parses the whole input; trailing tokens are an error.
    pub fn parse(&mut self) -> EvalResult<Expr> {
        if self.current_token == Token::Eof {
            return Err(syntax("empty expression"));
        }

        let expr = self.parse_addition()?;

        if self.current_token != Token::Eof {
            return Err(syntax(format!(
                "unexpected token at end: {:?}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn parse_addition(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_multiplication()?;
        let mut levels = 0;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            // Each operator adds one level to the left-leaning tree.
            self.enter()?;
            levels += 1;
            self.advance()?;
            let right = self.parse_multiplication()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: op,
                right: Box::new(right),
            };
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_unary()?;
        let mut levels = 0;

        loop {
            let op = match self.current_token {
                Token::Multiply => BinaryOp::Multiply,
                Token::Divide => BinaryOp::Divide,
                _ => break,
            };
            self.enter()?;
            levels += 1;
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: op,
                right: Box::new(right),
            };
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let operator = match self.current_token {
            Token::Plus => UnaryOp::Plus,
            Token::Minus => UnaryOp::Minus,
            _ => return self.parse_power(),
        };
        self.enter()?;
        self.advance()?;
        let operand = self.parse_unary()?;
        self.leave(1);
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    /// Parses power expressions (right-associative).
    fn parse_power(&mut self) -> EvalResult<Expr> {
        let left = self.parse_primary()?;

        if self.current_token == Token::Power {
            self.enter()?;
            self.advance()?;
            let right = self.parse_unary()?;
            self.leave(1);
            Ok(Expr::Binary {
                left: Box::new(left),
                operator: BinaryOp::Power,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match &self.current_token {
            Token::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Expr::Number(value))
            }

            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;

                match name.as_str() {
                    "A" => return Ok(Expr::Operand(Operand::A)),
                    "B" => return Ok(Expr::Operand(Operand::B)),
                    "PI" => return Ok(Expr::Number(std::f64::consts::PI)),
                    _ => {}
                }

                let function = Function::from_name(&name)
                    .ok_or_else(|| syntax(format!("unknown identifier '{}'", name)))?;
                self.expect(Token::LeftParen)?;
                self.enter()?;
                let arg = self.parse_addition()?;
                self.leave(1);
                self.expect(Token::RightParen)?;
                Ok(Expr::FunctionCall {
                    function,
                    arg: Box::new(arg),
                })
            }

            Token::LeftParen => {
                self.enter()?;
                self.advance()?;
                let expr = self.parse_addition()?;
                self.leave(1);
                self.expect(Token::RightParen)?;
                Ok(expr)
            }

            _ => Err(syntax(format!("unexpected token: {:?}", self.current_token))),
        }
    }
}

/// Parses `input` into an expression tree.
pub fn parse_expression(input: &str) -> EvalResult<Expr> {
    Parser::new(input)?.parse()
}

/// Evaluates an expression tree for one pair of operand values.
pub struct ExpressionEvaluator {
    a: f64,
    b: f64,
}

impl ExpressionEvaluator {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub fn evaluate(&self, expr: &Expr) -> EvalResult<f64> {
        match expr {
            Expr::Number(value) => Ok(*value),

            Expr::Operand(Operand::A) => Ok(self.a),
            Expr::Operand(Operand::B) => Ok(self.b),

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;

                match operator {
                    BinaryOp::Add => Ok(left_val + right_val),
                    BinaryOp::Subtract => Ok(left_val - right_val),
                    BinaryOp::Multiply => Ok(left_val * right_val),
                    BinaryOp::Divide => {
                        if right_val == 0.0 {
                            Err(EvalError::DivideByZero)
                        } else {
                            Ok(left_val / right_val)
                        }
                    }
                    BinaryOp::Power => power(left_val, right_val),
                }
            }

            Expr::Unary { operator, operand } => {
                let operand_val = self.evaluate(operand)?;

                match operator {
                    UnaryOp::Plus => Ok(operand_val),
                    UnaryOp::Minus => Ok(-operand_val),
                }
            }

            Expr::FunctionCall { function, arg } => function.apply(self.evaluate(arg)?),
        }
    }
}

fn power(base: f64, exponent: f64) -> EvalResult<f64> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::DivideByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvalError::DomainError(
            "fractional power of a negative number".to_string(),
        ));
    }

    let result = base.powf(exponent);
    if result.is_infinite() && base.is_finite() && exponent.is_finite() {
        return Err(EvalError::DomainError("result out of range".to_string()));
    }
    Ok(result)
}

/// Parses and evaluates `expression` with `A = a` and `B = b`.
///
/// Results are not rounded.
pub fn evaluate(expression: &str, a: f64, b: f64) -> EvalResult<f64> {
    let expr = parse_expression(expression)?;
    ExpressionEvaluator::new(a, b).evaluate(&expr)
}
