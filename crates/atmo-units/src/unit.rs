//! Unit expressions: parsing, composition and conversion.
//!
//! A [`Unit`] is a scale factor to SI base units, an optional offset (only
//! for standalone temperature scales such as `degC`), and a [`Dimension`].
//! Expressions are products and quotients of symbols with integer exponents:
//!
//! ```text
//! km    m^-3    cm**-3    kg/m^2    kg * m^-2    1/(cm^2)    dobson_unit
//! ```
//!
//! SI prefixes (`da h k M G d c m u µ n`) are accepted on `m`, `g`, `s`,
//! `Pa`, `bar` and `mol`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dimension::Dimension;
use crate::error::{UnitsError, UnitsResult};

/// Unified atomic mass unit in kilograms.
pub const DALTON_KG: f64 = 1.660_539_066_60e-27;

/// One Dobson unit in molecules per square metre.
pub const DOBSON_UNIT_PER_M2: f64 = 2.687e20;

const D: Dimension = Dimension::DIMENSIONLESS;

/// Known symbols: (symbol, scale to SI, offset, dimension).
const SYMBOLS: &[(&str, f64, f64, Dimension)] = &[
    // length
    ("m", 1.0, 0.0, Dimension::LENGTH),
    ("meter", 1.0, 0.0, Dimension::LENGTH),
    ("meters", 1.0, 0.0, Dimension::LENGTH),
    ("metre", 1.0, 0.0, Dimension::LENGTH),
    ("kilometer", 1e3, 0.0, Dimension::LENGTH),
    ("kilometers", 1e3, 0.0, Dimension::LENGTH),
    ("centimeter", 1e-2, 0.0, Dimension::LENGTH),
    // mass
    ("g", 1e-3, 0.0, Dimension::MASS),
    ("gram", 1e-3, 0.0, Dimension::MASS),
    ("kg", 1.0, 0.0, Dimension::MASS),
    ("kilogram", 1.0, 0.0, Dimension::MASS),
    ("Da", DALTON_KG, 0.0, Dimension::MASS),
    ("dalton", DALTON_KG, 0.0, Dimension::MASS),
    // time
    ("s", 1.0, 0.0, Dimension::TIME),
    ("second", 1.0, 0.0, Dimension::TIME),
    ("min", 60.0, 0.0, Dimension::TIME),
    ("minute", 60.0, 0.0, Dimension::TIME),
    ("h", 3600.0, 0.0, Dimension::TIME),
    ("hour", 3600.0, 0.0, Dimension::TIME),
    ("day", 86400.0, 0.0, Dimension::TIME),
    // pressure
    ("Pa", 1.0, 0.0, Dimension::PRESSURE),
    ("pascal", 1.0, 0.0, Dimension::PRESSURE),
    ("hectopascal", 1e2, 0.0, Dimension::PRESSURE),
    ("bar", 1e5, 0.0, Dimension::PRESSURE),
    ("millibar", 1e2, 0.0, Dimension::PRESSURE),
    ("atm", 101_325.0, 0.0, Dimension::PRESSURE),
    ("atmosphere", 101_325.0, 0.0, Dimension::PRESSURE),
    // temperature
    ("K", 1.0, 0.0, Dimension::TEMPERATURE),
    ("kelvin", 1.0, 0.0, Dimension::TEMPERATURE),
    ("degC", 1.0, 273.15, Dimension::TEMPERATURE),
    ("celsius", 1.0, 273.15, Dimension::TEMPERATURE),
    ("°C", 1.0, 273.15, Dimension::TEMPERATURE),
    // amount of substance
    ("mol", 1.0, 0.0, Dimension::SUBSTANCE),
    ("mole", 1.0, 0.0, Dimension::SUBSTANCE),
    // energy
    ("J", 1.0, 0.0, Dimension::ENERGY),
    ("joule", 1.0, 0.0, Dimension::ENERGY),
    // ratios
    ("dimensionless", 1.0, 0.0, D),
    ("percent", 1e-2, 0.0, D),
    ("%", 1e-2, 0.0, D),
    ("ppm", 1e-6, 0.0, D),
    ("ppmv", 1e-6, 0.0, D),
    ("parts_per_million", 1e-6, 0.0, D),
    ("ppb", 1e-9, 0.0, D),
    ("ppbv", 1e-9, 0.0, D),
    ("parts_per_billion", 1e-9, 0.0, D),
    ("ppt", 1e-12, 0.0, D),
    ("pptv", 1e-12, 0.0, D),
    ("parts_per_trillion", 1e-12, 0.0, D),
    // column amounts
    ("dobson_unit", DOBSON_UNIT_PER_M2, 0.0, Dimension::COLUMN_NUMBER_DENSITY),
    ("dobson_units", DOBSON_UNIT_PER_M2, 0.0, Dimension::COLUMN_NUMBER_DENSITY),
    ("dobson", DOBSON_UNIT_PER_M2, 0.0, Dimension::COLUMN_NUMBER_DENSITY),
    ("du", DOBSON_UNIT_PER_M2, 0.0, Dimension::COLUMN_NUMBER_DENSITY),
    ("DU", DOBSON_UNIT_PER_M2, 0.0, Dimension::COLUMN_NUMBER_DENSITY),
];

const PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("h", 1e2),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("μ", 1e-6),
    ("n", 1e-9),
];

const PREFIXABLE: &[&str] = &["m", "g", "s", "Pa", "bar", "mol"];

fn lookup_symbol(name: &str) -> Option<(f64, f64, Dimension)> {
    if let Some((_, scale, offset, dim)) = SYMBOLS.iter().find(|(s, ..)| *s == name) {
        return Some((*scale, *offset, *dim));
    }
    for &(prefix, factor) in PREFIXES {
        if let Some(base) = name.strip_prefix(prefix) {
            if PREFIXABLE.contains(&base) {
                let (scale, _, dim) = lookup_symbol(base)?;
                return Some((scale * factor, 0.0, dim));
            }
        }
    }
    None
}

/// A physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    symbol: String,
    scale: f64,
    offset: f64,
    dimension: Dimension,
}

impl Unit {
    /// Parse a unit expression.
    pub fn parse(expr: &str) -> UnitsResult<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Ok(Self::dimensionless());
        }
        let tokens = tokenize(trimmed)?;
        let mut parser = Parser {
            expr: trimmed,
            tokens: &tokens,
            pos: 0,
        };
        let parsed = parser.expression()?;
        if parser.pos != tokens.len() {
            return Err(UnitsError::invalid_expression(trimmed, "unexpected trailing input"));
        }
        if parsed.offset != 0.0 && parsed.factors > 1 {
            return Err(UnitsError::invalid_expression(
                trimmed,
                "offset units cannot be combined with other units",
            ));
        }
        Ok(Self {
            symbol: trimmed.to_string(),
            scale: parsed.scale,
            offset: parsed.offset,
            dimension: parsed.dimension,
        })
    }

    pub fn dimensionless() -> Self {
        Self {
            symbol: "dimensionless".to_string(),
            scale: 1.0,
            offset: 0.0,
            dimension: Dimension::DIMENSIONLESS,
        }
    }

    /// The coherent SI unit of a dimension, e.g. `kg * m^-2`.
    pub fn base(dimension: Dimension) -> Self {
        const BASE_SYMBOLS: [&str; 5] = ["m", "kg", "s", "K", "mol"];
        let exps = dimension.exponents();
        let mut parts: Vec<String> = Vec::new();
        // mass leads, then length, time, temperature, substance
        for idx in [1usize, 0, 2, 3, 4] {
            match exps[idx] {
                0 => {}
                1 => parts.push(BASE_SYMBOLS[idx].to_string()),
                e => parts.push(format!("{}^{}", BASE_SYMBOLS[idx], e)),
            }
        }
        if parts.is_empty() {
            return Self::dimensionless();
        }
        Self {
            symbol: parts.join(" * "),
            scale: 1.0,
            offset: 0.0,
            dimension,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Multiplicative factor to the coherent SI unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    /// Check whether values in this unit can be expressed in `other`.
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Convert magnitudes expressed in `self` into `to`.
    pub fn convert(&self, values: &[f64], to: &Unit) -> UnitsResult<Vec<f64>> {
        if !self.is_compatible(to) {
            return Err(UnitsError::Dimensionality {
                from: self.symbol.clone(),
                from_dimension: self.dimension.to_string(),
                to: to.symbol.clone(),
                to_dimension: to.dimension.to_string(),
            });
        }
        Ok(values
            .iter()
            .map(|v| (v * self.scale + self.offset - to.offset) / to.scale)
            .collect())
    }

    /// Product of two units.
    pub fn try_mul(&self, rhs: &Unit) -> UnitsResult<Unit> {
        let symbol = match (self.is_unit_one(), rhs.is_unit_one()) {
            (true, _) => rhs.symbol.clone(),
            (_, true) => self.symbol.clone(),
            _ => format!("{} * {}", wrap(&self.symbol), wrap(&rhs.symbol)),
        };
        let dimension = self
            .dimension
            .checked_mul(rhs.dimension)
            .ok_or_else(|| UnitsError::invalid_expression(&symbol, "exponent overflow"))?;
        Ok(Unit {
            symbol,
            scale: self.scale * rhs.scale,
            offset: 0.0,
            dimension,
        })
    }

    /// Quotient of two units.
    pub fn try_div(&self, rhs: &Unit) -> UnitsResult<Unit> {
        let symbol = if rhs.is_unit_one() {
            self.symbol.clone()
        } else {
            format!("{} / {}", wrap(&self.symbol), wrap(&rhs.symbol))
        };
        let dimension = self
            .dimension
            .checked_div(rhs.dimension)
            .ok_or_else(|| UnitsError::invalid_expression(&symbol, "exponent overflow"))?;
        Ok(Unit {
            symbol,
            scale: self.scale / rhs.scale,
            offset: 0.0,
            dimension,
        })
    }

    fn is_unit_one(&self) -> bool {
        self.is_dimensionless() && self.scale == 1.0
    }
}

fn wrap(symbol: &str) -> String {
    if symbol.contains(' ') || symbol.contains('/') || symbol.contains('^') {
        format!("({})", symbol)
    } else {
        symbol.to_string()
    }
}

impl FromStr for Unit {
    type Err = UnitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

impl TryFrom<String> for Unit {
    type Error = UnitsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Unit::parse(&value)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// ============================================================================
// Expression parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Symbol(String),
    Number(f64),
    Mul,
    Div,
    Pow,
    LParen,
    RParen,
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '%' || c == '°'
}

fn tokenize(expr: &str) -> UnitsResult<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' | '·' => {
                tokens.push(Token::Mul);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Div);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit()
                || c == '.'
                || ((c == '-' || c == '+') && tokens.last() == Some(&Token::Pow)) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    let exponent_sign = (d == '-' || d == '+')
                        && matches!(chars[i - 1], 'e' | 'E');
                    if d.is_ascii_digit() || d == '.' || exponent_sign {
                        i += 1;
                    } else if (d == 'e' || d == 'E')
                        && chars
                            .get(i + 1)
                            .is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+')
                    {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| {
                    UnitsError::invalid_expression(expr, format!("invalid number '{}'", text))
                })?;
                tokens.push(Token::Number(value));
            }
            c if is_symbol_char(c) => {
                let start = i;
                while i < chars.len() && is_symbol_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Symbol(chars[start..i].iter().collect()));
            }
            other => {
                return Err(UnitsError::invalid_expression(
                    expr,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }
    Ok(tokens)
}

struct Parsed {
    scale: f64,
    offset: f64,
    dimension: Dimension,
    factors: usize,
}

impl Parsed {
    fn one() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
            dimension: Dimension::DIMENSIONLESS,
            factors: 0,
        }
    }

    fn combine(self, rhs: Parsed, divide: bool) -> Option<Parsed> {
        let (scale, dimension) = if divide {
            (self.scale / rhs.scale, self.dimension.checked_div(rhs.dimension)?)
        } else {
            (self.scale * rhs.scale, self.dimension.checked_mul(rhs.dimension)?)
        };
        let factors = self.factors + rhs.factors;
        // an offset survives only if it is the sole factor
        let offset = if factors == 1 {
            self.offset + rhs.offset
        } else {
            self.offset.max(rhs.offset)
        };
        Some(Parsed {
            scale,
            offset,
            dimension,
            factors,
        })
    }
}

struct Parser<'a> {
    expr: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn overflow(&self) -> UnitsError {
        UnitsError::invalid_expression(self.expr, "exponent overflow")
    }

    fn expression(&mut self) -> UnitsResult<Parsed> {
        let first = self.term()?;
        let mut acc = Parsed::one()
            .combine(first, false)
            .ok_or_else(|| self.overflow())?;
        loop {
            let divide = match self.peek() {
                Some(Token::Mul) => {
                    self.pos += 1;
                    false
                }
                Some(Token::Div) => {
                    self.pos += 1;
                    true
                }
                Some(Token::Symbol(_)) | Some(Token::Number(_)) | Some(Token::LParen) => false,
                _ => break,
            };
            let rhs = self.term()?;
            acc = acc.combine(rhs, divide).ok_or_else(|| self.overflow())?;
        }
        Ok(acc)
    }

    fn term(&mut self) -> UnitsResult<Parsed> {
        let mut atom = self.atom()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exp = match self.peek() {
                Some(Token::Number(n)) if n.fract() == 0.0 && n.abs() < 127.0 => *n as i8,
                _ => {
                    return Err(UnitsError::invalid_expression(
                        self.expr,
                        "exponent must be an integer",
                    ))
                }
            };
            self.pos += 1;
            if exp != 1 {
                atom = Parsed {
                    scale: atom.scale.powi(i32::from(exp)),
                    offset: 0.0,
                    dimension: atom
                        .dimension
                        .checked_powi(exp)
                        .ok_or_else(|| self.overflow())?,
                    // a powered offset unit is no longer standalone
                    factors: atom.factors.max(2),
                };
            }
        }
        Ok(atom)
    }

    fn atom(&mut self) -> UnitsResult<Parsed> {
        let token = self.peek().cloned();
        self.pos += 1;
        match token {
            Some(Token::Symbol(name)) => {
                let (scale, offset, dimension) =
                    lookup_symbol(&name).ok_or(UnitsError::UnknownUnit(name))?;
                Ok(Parsed {
                    scale,
                    offset,
                    dimension,
                    factors: 1,
                })
            }
            Some(Token::Number(value)) => Ok(Parsed {
                scale: value,
                offset: 0.0,
                dimension: Dimension::DIMENSIONLESS,
                factors: 0,
            }),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(UnitsError::invalid_expression(self.expr, "unbalanced parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            _ => Err(UnitsError::invalid_expression(self.expr, "expected a unit symbol")),
        }
    }
}
