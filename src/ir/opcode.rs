use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use super::error::ParseError;

/// The fixed opcode vocabulary of the three-address code.
///
/// `Assign` never appears in the input; it is introduced by the optimiser
/// when an instruction collapses to a plain copy into its own register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    CmpEq,
    CmpLe,
    CmpLt,
    Br,
    Blbc,
    Blbs,
    Load,
    Store,
    Move,
    Read,
    Write,
    Wrl,
    Param,
    Enter,
    EntryPc,
    Call,
    Ret,
    Nop,
    Assign,
}

impl Opcode {
    /// The number of operands this opcode requires. Parsing fails unless the
    /// operand count of a line matches exactly.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::CmpEq
            | Opcode::CmpLe
            | Opcode::CmpLt
            | Opcode::Blbc
            | Opcode::Blbs
            | Opcode::Store
            | Opcode::Move => 2,
            Opcode::Neg
            | Opcode::Br
            | Opcode::Load
            | Opcode::Write
            | Opcode::Param
            | Opcode::Enter
            | Opcode::Call
            | Opcode::Ret
            | Opcode::Assign => 1,
            Opcode::Read | Opcode::Wrl | Opcode::EntryPc | Opcode::Nop => 0,
        }
    }

    /// True for the three control-transfer opcodes.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Br | Opcode::Blbc | Opcode::Blbs)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Neg => "neg",
            Opcode::CmpEq => "cmpeq",
            Opcode::CmpLe => "cmple",
            Opcode::CmpLt => "cmplt",
            Opcode::Br => "br",
            Opcode::Blbc => "blbc",
            Opcode::Blbs => "blbs",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Move => "move",
            Opcode::Read => "read",
            Opcode::Write => "write",
            Opcode::Wrl => "wrl",
            Opcode::Param => "param",
            Opcode::Enter => "enter",
            Opcode::EntryPc => "entrypc",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Nop => "nop",
            Opcode::Assign => "assign",
        }
    }
}

impl FromStr for Opcode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let opcode = match s.to_ascii_lowercase().as_str() {
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "div" => Opcode::Div,
            "mod" => Opcode::Mod,
            "neg" => Opcode::Neg,
            "cmpeq" => Opcode::CmpEq,
            "cmple" => Opcode::CmpLe,
            "cmplt" => Opcode::CmpLt,
            "br" => Opcode::Br,
            "blbc" => Opcode::Blbc,
            "blbs" => Opcode::Blbs,
            "load" => Opcode::Load,
            "store" => Opcode::Store,
            "move" => Opcode::Move,
            "read" => Opcode::Read,
            "write" => Opcode::Write,
            "wrl" => Opcode::Wrl,
            "param" => Opcode::Param,
            "enter" => Opcode::Enter,
            "entrypc" => Opcode::EntryPc,
            "call" => Opcode::Call,
            "ret" => Opcode::Ret,
            "nop" => Opcode::Nop,
            "assign" => Opcode::Assign,
            _ => return Err(ParseError::UnknownOpcode(s.to_string())),
        };
        Ok(opcode)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip() {
        for keyword in [
            "add", "sub", "mul", "div", "mod", "neg", "cmpeq", "cmple", "cmplt", "br", "blbc",
            "blbs", "load", "store", "move", "read", "write", "wrl", "param", "enter", "entrypc",
            "call", "ret", "nop", "assign",
        ] {
            let opcode: Opcode = keyword.parse().expect("keyword should parse");
            assert_eq!(keyword, opcode.to_string());
        }
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(Opcode::CmpEq, "CMPEQ".parse::<Opcode>().unwrap());
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        assert!("jmp".parse::<Opcode>().is_err());
        // A keyword prefix is not a match.
        assert!("addx".parse::<Opcode>().is_err());
    }
}
