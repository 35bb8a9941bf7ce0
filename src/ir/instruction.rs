use std::fmt::{self, Display, Formatter};

use super::{error::ParseError, Opcode, Operand};

/// One three-address instruction.
///
/// The `label` doubles as the instruction's address and, for opcodes that
/// produce a result, as the name of the virtual register holding it.
/// `is_block_leader` and `predecessor_labels` are filled in by the leader
/// scan; `predecessor_labels` records the labels of *branch* instructions
/// targeting this one (block-level predecessor sets are kept on the blocks
/// themselves).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub label: i64,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub is_block_leader: bool,
    pub predecessor_labels: Vec<i64>,
}

/// A storage location a definition can write to: either a virtual register,
/// named by the label of the instruction producing it, or a named variable.
/// Variables are keyed by their rendered operand text (`a#-8`, `g#32576`),
/// which is unique per storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Place {
    Register(i64),
    Variable(String),
}

impl Instruction {
    /// Parses a single `instr <label>: <opcode> [<op> [<op>]]` line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedLine(line.trim().to_string());

        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("instr") {
            return Err(malformed());
        }
        let label = tokens
            .next()
            .and_then(|t| t.strip_suffix(':'))
            .ok_or_else(malformed)?
            .parse::<i64>()
            .map_err(|_| malformed())?;
        let opcode: Opcode = tokens.next().ok_or_else(malformed)?.parse()?;

        let in_call = opcode == Opcode::Call;
        let operands = tokens
            .map(|token| Operand::parse(token, in_call))
            .collect::<Result<Vec<_>, _>>()?;
        if operands.len() != opcode.arity() {
            return Err(ParseError::OperandCount {
                opcode,
                expected: opcode.arity(),
                found: operands.len(),
            });
        }

        Ok(Self {
            label,
            opcode,
            operands,
            is_block_leader: false,
            predecessor_labels: vec![],
        })
    }

    pub fn is_branch(&self) -> bool {
        self.opcode.is_branch()
    }

    /// The label this instruction branches to. Panics on non-branches.
    pub fn branch_target(&self) -> i64 {
        assert!(self.is_branch(), "instruction {} is not a branch", self.label);
        match self.operands.last() {
            Some(Operand::InstrLabel(target)) => *target,
            other => panic!("branch {} has no label operand: {:?}", self.label, other),
        }
    }

    /// Turns this instruction into a `nop`, keeping its label slot so that
    /// block boundaries and the label → block map stay valid.
    pub fn to_nop(&mut self) {
        self.opcode = Opcode::Nop;
        self.operands.clear();
    }

    /// True for the opcodes whose operands constant propagation may rewrite.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Neg
                | Opcode::CmpEq
                | Opcode::CmpLe
                | Opcode::CmpLt
        )
    }

    /// The place this instruction defines, if any. Result-producing opcodes
    /// define the register named by their own label; `move` defines its
    /// first operand.
    pub fn def(&self) -> Option<Place> {
        match self.opcode {
            Opcode::Move => place_of(&self.operands[0]),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Neg
            | Opcode::CmpEq
            | Opcode::CmpLe
            | Opcode::CmpLt
            | Opcode::Load
            | Opcode::Read
            | Opcode::Assign => Some(Place::Register(self.label)),
            _ => None,
        }
    }

    pub fn is_def(&self) -> bool {
        self.def().is_some()
    }

    /// The constant this definition assigns, for `move`/`assign` from an
    /// immediate. Such definitions are the seeds of constant propagation.
    pub fn constant_value(&self) -> Option<i64> {
        let source = match self.opcode {
            Opcode::Move => self.operands.get(1),
            Opcode::Assign => self.operands.first(),
            _ => None,
        };
        match source {
            Some(&Operand::Constant(value)) => Some(value),
            _ => None,
        }
    }

    /// The operands this instruction reads (as opposed to writes or jumps to).
    pub fn used_operands(&self) -> &[Operand] {
        match self.opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::CmpEq
            | Opcode::CmpLe
            | Opcode::CmpLt
            | Opcode::Store => &self.operands[..],
            Opcode::Move => &self.operands[1..],
            Opcode::Neg
            | Opcode::Blbc
            | Opcode::Blbs
            | Opcode::Load
            | Opcode::Write
            | Opcode::Param
            | Opcode::Assign => &self.operands[..1],
            _ => &[],
        }
    }

    /// Mutable view of the read operands, for rewriting by the optimiser.
    pub fn used_operands_mut(&mut self) -> &mut [Operand] {
        match self.opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::CmpEq
            | Opcode::CmpLe
            | Opcode::CmpLt
            | Opcode::Store => &mut self.operands[..],
            Opcode::Move => &mut self.operands[1..],
            Opcode::Neg
            | Opcode::Blbc
            | Opcode::Blbs
            | Opcode::Load
            | Opcode::Write
            | Opcode::Param
            | Opcode::Assign => &mut self.operands[..1],
            _ => &mut [],
        }
    }

    /// The place this instruction defines, restricted to frame-private
    /// scalars (local variables, parameters, virtual registers). Globals and
    /// memory reached through pointers are never eligible for elimination,
    /// and `read` keeps its input-consuming side effect even when its result
    /// is dead.
    pub fn def_for_liveness(&self) -> Option<Place> {
        match self.opcode {
            Opcode::Read => None,
            Opcode::Move => frame_place(&self.operands[0]),
            _ => self.def(),
        }
    }

    /// The frame-private scalars this instruction reads.
    pub fn uses_for_liveness(&self) -> Vec<Place> {
        self.used_operands().iter().filter_map(frame_place).collect()
    }
}

/// The place an operand refers to, for any named or register storage.
pub fn place_of(operand: &Operand) -> Option<Place> {
    match operand {
        Operand::Register(reg) => Some(Place::Register(*reg)),
        Operand::LocalVariable { .. }
        | Operand::Parameter { .. }
        | Operand::GlobalVariable { .. } => Some(Place::Variable(operand.to_string())),
        _ => None,
    }
}

/// Like [`place_of`], but excluding global variables.
fn frame_place(operand: &Operand) -> Option<Place> {
    match operand {
        Operand::Register(reg) => Some(Place::Register(*reg)),
        Operand::LocalVariable { .. } | Operand::Parameter { .. } => {
            Some(Place::Variable(operand.to_string()))
        }
        _ => None,
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "instr {}: {}", self.label, self.opcode)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}
