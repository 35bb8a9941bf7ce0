use crate::ir::Operand;

/// The first address past the global segment. The last global variable is
/// sized by its distance to this boundary.
pub const GLOBAL_SEGMENT_TOP: i64 = 32768;

/// A named storage slot, either in a stack frame (address relative to FP) or
/// in the global segment (relative to GP).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub address: i64,
    /// Size in bytes, back-filled from the address of the next variable.
    pub size: i64,
}

impl Variable {
    pub fn new(name: &str, address: i64) -> Self {
        Self {
            name: name.to_string(),
            address,
            size: 8,
        }
    }

    /// Extracts the variable an operand names, if it names one in the
    /// frame-or-global sense used by the declaration scans.
    pub fn from_operand(operand: &Operand) -> Option<Self> {
        match operand {
            Operand::LocalVariable { name, offset }
            | Operand::LocalAddress { name, offset }
            | Operand::GlobalAddress { name, offset } => Some(Variable::new(name, *offset)),
            _ => None,
        }
    }
}

/// Deduplicates and sizes a scanned variable table. Variables are sorted by
/// address to compute each one's size as the gap to its neighbour; the
/// variable closest to `top` is sized by the remaining distance. The result
/// is reversed into source declaration order.
pub fn finalise_table(mut variables: Vec<Variable>, top: i64) -> Vec<Variable> {
    variables.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.name.cmp(&b.name)));
    variables.dedup();

    if let Some(last) = variables.len().checked_sub(1) {
        for i in 0..last {
            variables[i].size = variables[i + 1].address - variables[i].address;
        }
        variables[last].size = top - variables[last].address;
    }

    variables.reverse();
    variables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_gaps_between_addresses() {
        let table = finalise_table(
            vec![
                Variable::new("i", -8),
                Variable::new("buf", -72),
                Variable::new("i", -8),
                Variable::new("j", -16),
            ],
            0,
        );
        let summary: Vec<_> = table
            .iter()
            .map(|v| (v.name.as_str(), v.address, v.size))
            .collect();
        assert_eq!(vec![("i", -8, 8), ("j", -16, 8), ("buf", -72, 56)], summary);
    }

    #[test]
    fn last_global_is_sized_to_the_segment_top() {
        let table = finalise_table(vec![Variable::new("g", 32760)], GLOBAL_SEGMENT_TOP);
        assert_eq!(8, table[0].size);
    }

    #[test]
    fn empty_table_stays_empty() {
        assert!(finalise_table(vec![], 0).is_empty());
    }
}
