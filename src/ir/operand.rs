use std::fmt::{self, Display, Formatter};

use super::error::ParseError;

/// Addresses above this offset belong to the global segment; `_base` tokens
/// with a larger offset denote global addresses, those with a negative offset
/// denote local (frame) addresses.
pub const GLOBAL_AREA_FLOOR: i64 = 8192;

/// A single instruction operand.
///
/// Classification is purely lexical: each variant corresponds to one token
/// shape in the input. `GlobalVariable` is the exception; it is never parsed,
/// only introduced when the peephole rewriter collapses an address
/// computation into a named global.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// The global pointer.
    Gp,
    /// The frame pointer.
    Fp,
    Constant(i64),
    FieldOffset { name: String, offset: i64 },
    LocalVariable { name: String, offset: i64 },
    GlobalVariable { name: String, offset: i64 },
    LocalAddress { name: String, offset: i64 },
    GlobalAddress { name: String, offset: i64 },
    Parameter { name: String, offset: i64 },
    /// A virtual register, named by the label of the instruction defining it.
    Register(i64),
    /// The label of a branch target instruction.
    InstrLabel(i64),
    /// A function id (the label of its `enter`), only valid in `call`.
    FunctionId(i64),
}

impl Operand {
    /// Classifies one whitespace-free token. Bracketed integers are function
    /// ids when the owning instruction is a `call`, instruction labels
    /// everywhere else.
    pub fn parse(token: &str, in_call: bool) -> Result<Self, ParseError> {
        if let Some(inner) = delimited(token, '(', ')') {
            return Ok(Operand::Register(parse_int(inner)?));
        }
        if let Some(inner) = delimited(token, '[', ']') {
            let value = parse_int(inner)?;
            return Ok(if in_call {
                Operand::FunctionId(value)
            } else {
                Operand::InstrLabel(value)
            });
        }
        if let Some((name, offset)) = split_suffixed(token, "_base#")? {
            return if offset > GLOBAL_AREA_FLOOR {
                Ok(Operand::GlobalAddress { name, offset })
            } else if offset < 0 {
                Ok(Operand::LocalAddress { name, offset })
            } else {
                Err(ParseError::MalformedOperand(token.to_string()))
            };
        }
        if let Some((name, offset)) = split_suffixed(token, "_offset#")? {
            return Ok(Operand::FieldOffset { name, offset });
        }
        if let Some((name, offset)) = split_suffixed(token, "#")? {
            return if offset < 0 {
                Ok(Operand::LocalVariable { name, offset })
            } else {
                Ok(Operand::Parameter { name, offset })
            };
        }
        match token {
            "GP" => Ok(Operand::Gp),
            "FP" => Ok(Operand::Fp),
            _ => Ok(Operand::Constant(parse_int(token)?)),
        }
    }

    /// True for a local variable or the address of one.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Operand::LocalVariable { .. } | Operand::LocalAddress { .. }
        )
    }

}

fn delimited<'t>(token: &'t str, open: char, close: char) -> Option<&'t str> {
    token
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
}

/// Splits `name<marker><int>` tokens such as `a#-24` or `g_base#32576`.
fn split_suffixed(token: &str, marker: &str) -> Result<Option<(String, i64)>, ParseError> {
    match token.split_once(marker) {
        Some((name, offset)) if !name.is_empty() => Ok(Some((name.to_string(), parse_int(offset)?))),
        Some(_) => Err(ParseError::MalformedOperand(token.to_string())),
        None => Ok(None),
    }
}

fn parse_int(text: &str) -> Result<i64, ParseError> {
    text.parse()
        .map_err(|_| ParseError::IntegerLiteral(text.to_string()))
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Operand::Gp => f.write_str("GP"),
            Operand::Fp => f.write_str("FP"),
            Operand::Constant(value) => write!(f, "{}", value),
            Operand::FieldOffset { name, offset } => write!(f, "{}_offset#{}", name, offset),
            Operand::LocalVariable { name, offset }
            | Operand::GlobalVariable { name, offset }
            | Operand::Parameter { name, offset } => write!(f, "{}#{}", name, offset),
            Operand::LocalAddress { name, offset } | Operand::GlobalAddress { name, offset } => {
                write!(f, "{}_base#{}", name, offset)
            }
            Operand::Register(reg) => write!(f, "({})", reg),
            Operand::InstrLabel(label) => write!(f, "[{}]", label),
            Operand::FunctionId(id) => write!(f, "[{}]", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(token: &str) -> Operand {
        Operand::parse(token, false).expect("operand should parse")
    }

    #[test]
    fn register_reference() {
        assert_eq!(Operand::Register(70), parse("(70)"));
    }

    #[test]
    fn bracketed_integer_depends_on_call_context() {
        assert_eq!(Operand::InstrLabel(41), parse("[41]"));
        assert_eq!(
            Operand::FunctionId(41),
            Operand::parse("[41]", true).unwrap()
        );
    }

    #[test]
    fn base_token_splits_on_area() {
        assert_eq!(
            Operand::GlobalAddress {
                name: "global_array".to_string(),
                offset: 32576
            },
            parse("global_array_base#32576")
        );
        assert_eq!(
            Operand::LocalAddress {
                name: "buf".to_string(),
                offset: -64
            },
            parse("buf_base#-64")
        );
        // The gap between the frame and the global segment is unmapped.
        assert!(Operand::parse("x_base#100", false).is_err());
    }

    #[test]
    fn field_offset() {
        assert_eq!(
            Operand::FieldOffset {
                name: "y".to_string(),
                offset: 8
            },
            parse("y_offset#8")
        );
    }

    #[test]
    fn offset_sign_separates_locals_from_parameters() {
        assert_eq!(
            Operand::LocalVariable {
                name: "i".to_string(),
                offset: -8
            },
            parse("i#-8")
        );
        assert_eq!(
            Operand::Parameter {
                name: "a".to_string(),
                offset: 24
            },
            parse("a#24")
        );
    }

    #[test]
    fn pointer_markers_and_constants() {
        assert_eq!(Operand::Gp, parse("GP"));
        assert_eq!(Operand::Fp, parse("FP"));
        assert_eq!(Operand::Constant(-5), parse("-5"));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(Operand::parse("(x)", false).is_err());
        assert!(Operand::parse("#8", false).is_err());
        assert!(Operand::parse("banana!", false).is_err());
    }

    #[test]
    fn rendering_round_trips() {
        for token in ["GP", "FP", "42", "(3)", "[17]", "a#24", "i#-8", "g_base#32576"] {
            assert_eq!(token, parse(token).to_string());
        }
    }
}
