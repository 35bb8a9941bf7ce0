//! Control-flow summary output: per function, the block leaders and one
//! `<leader> -> <successors>` line per block.

use std::fmt::Write;

use crate::cfg::Program;

pub fn render(program: &Program) -> String {
    let mut out = String::new();
    for function in &program.functions {
        writeln!(out, "Function: {}", function.id).unwrap();
        let leaders: Vec<String> = function
            .blocks
            .iter()
            .map(|block| block.first_label().to_string())
            .collect();
        writeln!(out, "Basic blocks: {}", leaders.join(" ")).unwrap();
        writeln!(out, "CFG:").unwrap();
        for block in &function.blocks {
            write!(out, "{} ->", block.first_label()).unwrap();
            for successor in &block.successor_labels {
                write!(out, " {}", successor).unwrap();
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;

    #[test]
    fn summarises_leaders_and_edges() {
        let program = Program::from_instructions(
            ir::parse(
                "instr 2: enter 8
                 instr 3: cmplt i#-8 10
                 instr 4: blbs (3) [7]
                 instr 5: write i#-8
                 instr 6: br [3]
                 instr 7: ret 0",
            )
            .unwrap(),
        );
        let expected = "\
Function: 2
Basic blocks: 2 3 5 7
CFG:
2 -> 3
3 -> 5 7
5 -> 3
7 ->
";
        assert_eq!(expected, render(&program));
    }
}
