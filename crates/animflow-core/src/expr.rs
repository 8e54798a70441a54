//! Arithmetic and logical expressions over simulation variables.
//!
//! Used for breakpoint conditions, display readouts and ad-hoc evaluation
//! between animation steps. An expression is parsed once into a small tree
//! and evaluated against a [`VariableSet`]. Truth is "non-zero"; comparisons
//! and logical operators yield `1.0` or `0.0`.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := cmp ( "&&" cmp )*
//! cmp     := sum ( ("<" | "<=" | ">" | ">=" | "==" | "=" | "!=" | "<>") sum )?
//! sum     := product ( ("+" | "-") product )*
//! product := unary ( ("*" | "/" | "%") unary )*
//! unary   := ("-" | "!") unary | power
//! power   := atom ( "^" unary )?
//! atom    := number | name | name "(" args ")" | "(" or ")"
//! ```

use crate::sim::VariableSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken { pos: usize, found: String },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Operators producing a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Abs,
    Sqrt,
    Floor,
    Ceil,
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<Function> {
        Some(match name.to_ascii_lowercase().as_str() {
            "min" => Function::Min,
            "max" => Function::Max,
            "abs" => Function::Abs,
            "sqrt" => Function::Sqrt,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "round" => Function::Round,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
            Function::Sqrt => "sqrt",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Round => "round",
        }
    }

    fn check_arity(self, found: usize) -> Result<(), ExprError> {
        let (ok, expected) = match self {
            Function::Min | Function::Max => (found >= 1, "at least 1"),
            _ => (found == 1, "1"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExprError::Arity {
                name: self.name(),
                expected,
                found,
            })
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::Abs => args[0].abs(),
            Function::Sqrt => args[0].sqrt(),
            Function::Floor => args[0].floor(),
            Function::Ceil => args[0].ceil(),
            Function::Round => args[0].round(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Variable(String),
    Negate(Box<Node>),
    Not(Box<Node>),
    Arithmetic(ArithmeticOp, Box<Node>, Box<Node>),
    Compare(ComparisonOp, Box<Node>, Box<Node>),
    Logic(LogicOp, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if let Some((pos, tok)) = parser.tokens.get(parser.pos) {
            return Err(ExprError::UnexpectedToken {
                pos: *pos,
                found: tok.to_string(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, vars: &VariableSet) -> Result<f64, ExprError> {
        eval(&self.root, vars)
    }

    /// Evaluate and interpret the result as a truth value.
    pub fn is_true(&self, vars: &VariableSet) -> Result<bool, ExprError> {
        Ok(self.evaluate(vars)? != 0.0)
    }
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn eval(node: &Node, vars: &VariableSet) -> Result<f64, ExprError> {
    Ok(match node {
        Node::Number(v) => *v,
        Node::Variable(name) => vars
            .get(name)
            .ok_or_else(|| ExprError::UnknownVariable(name.clone()))?,
        Node::Negate(inner) => -eval(inner, vars)?,
        Node::Not(inner) => truth(eval(inner, vars)? == 0.0),
        Node::Arithmetic(op, l, r) => {
            let left = eval(l, vars)?;
            let right = eval(r, vars)?;
            match op {
                ArithmeticOp::Add => left + right,
                ArithmeticOp::Subtract => left - right,
                ArithmeticOp::Multiply => left * right,
                ArithmeticOp::Divide => {
                    if right == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    left / right
                }
                ArithmeticOp::Modulo => {
                    if right == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    left % right
                }
                ArithmeticOp::Power => left.powf(right),
            }
        }
        Node::Compare(op, l, r) => {
            let left = eval(l, vars)?;
            let right = eval(r, vars)?;
            truth(match op {
                ComparisonOp::Gt => left > right,
                ComparisonOp::Lt => left < right,
                ComparisonOp::Eq => left == right,
                ComparisonOp::Gte => left >= right,
                ComparisonOp::Lte => left <= right,
                ComparisonOp::Ne => left != right,
            })
        }
        Node::Logic(op, l, r) => {
            let left = eval(l, vars)? != 0.0;
            match (op, left) {
                (LogicOp::And, false) => 0.0,
                (LogicOp::Or, true) => 1.0,
                _ => truth(eval(r, vars)? != 0.0),
            }
        }
        Node::Call(function, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, vars))
                .collect::<Result<Vec<_>, _>>()?;
            function.apply(&values)
        }
    })
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Symbol(&'static str),
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(v) => write!(f, "{v}"),
            Token::Name(n) => f.write_str(n),
            Token::Symbol(s) => f.write_str(s),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

const SYMBOLS: [&str; 17] = [
    "<=", ">=", "==", "!=", "<>", "&&", "||", "<", ">", "=", "!", "+", "-", "*", "/", "%", "^",
];

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.get(i + 1).is_some_and(|(_, c)| c.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            // Optional exponent.
            if i < chars.len() && matches!(chars[i].1, 'e' | 'E') {
                let mut j = i + 1;
                if j < chars.len() && matches!(chars[j].1, '+' | '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].1.is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].1.is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
            tokens.push((pos, Token::Number(value)));
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || matches!(chars[i].1, '_' | '.')) {
                i += 1;
            }
            let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
            tokens.push((pos, Token::Name(text)));
            continue;
        }

        match ch {
            '(' => tokens.push((pos, Token::LParen)),
            ')' => tokens.push((pos, Token::RParen)),
            ',' => tokens.push((pos, Token::Comma)),
            _ => {
                let rest = &source[pos..];
                let Some(symbol) = SYMBOLS.iter().find(|s| rest.starts_with(**s)) else {
                    return Err(ExprError::UnexpectedChar { pos, ch });
                };
                tokens.push((pos, Token::Symbol(*symbol)));
                i += symbol.len();
                continue;
            }
        }
        i += 1;
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_symbol(&self) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Symbol(s)) => Some(*s),
            _ => None,
        }
    }

    fn next(&mut self) -> Result<(usize, Token), ExprError> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        let (pos, tok) = self.next()?;
        if tok == expected {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken {
                pos,
                found: tok.to_string(),
            })
        }
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_and()?;
        while self.peek_symbol() == Some("||") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            node = Node::Logic(LogicOp::Or, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_comparison()?;
        while self.peek_symbol() == Some("&&") {
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            node = Node::Logic(LogicOp::And, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<Node, ExprError> {
        let lhs = self.parse_sum()?;
        let op = match self.peek_symbol() {
            Some("<") => ComparisonOp::Lt,
            Some("<=") => ComparisonOp::Lte,
            Some(">") => ComparisonOp::Gt,
            Some(">=") => ComparisonOp::Gte,
            Some("==") | Some("=") => ComparisonOp::Eq,
            Some("!=") | Some("<>") => ComparisonOp::Ne,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_sum()?;
        Ok(Node::Compare(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_sum(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_product()?;
        loop {
            let op = match self.peek_symbol() {
                Some("+") => ArithmeticOp::Add,
                Some("-") => ArithmeticOp::Subtract,
                _ => return Ok(node),
            };
            self.pos += 1;
            let rhs = self.parse_product()?;
            node = Node::Arithmetic(op, Box::new(node), Box::new(rhs));
        }
    }

    fn parse_product(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.peek_symbol() {
                Some("*") => ArithmeticOp::Multiply,
                Some("/") => ArithmeticOp::Divide,
                Some("%") => ArithmeticOp::Modulo,
                _ => return Ok(node),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            node = Node::Arithmetic(op, Box::new(node), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        match self.peek_symbol() {
            Some("-") => {
                self.pos += 1;
                Ok(Node::Negate(Box::new(self.parse_unary()?)))
            }
            Some("+") => {
                self.pos += 1;
                self.parse_unary()
            }
            Some("!") => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Node, ExprError> {
        let base = self.parse_atom()?;
        if self.peek_symbol() == Some("^") {
            self.pos += 1;
            let exponent = self.parse_unary()?;
            return Ok(Node::Arithmetic(
                ArithmeticOp::Power,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Node, ExprError> {
        let (pos, tok) = self.next()?;
        match tok {
            Token::Number(v) => Ok(Node::Number(v)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Name(name) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Node::Variable(name));
                }
                let function =
                    Function::lookup(&name).ok_or(ExprError::UnknownFunction(name))?;
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                } else {
                    loop {
                        args.push(self.parse_or()?);
                        let (pos, tok) = self.next()?;
                        match tok {
                            Token::Comma => continue,
                            Token::RParen => break,
                            other => {
                                return Err(ExprError::UnexpectedToken {
                                    pos,
                                    found: other.to_string(),
                                });
                            }
                        }
                    }
                }
                function.check_arity(args.len())?;
                Ok(Node::Call(function, args))
            }
            other => Err(ExprError::UnexpectedToken {
                pos,
                found: other.to_string(),
            }),
        }
    }
}
