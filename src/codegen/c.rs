//! Translation to a C-like program: one statement per instruction, virtual
//! registers in a flat array, and jump labels on branch targets.

use std::fmt::Write;

use crate::cfg::{BasicBlock, Function, Program};
use crate::ir::{Instruction, Opcode, Operand};

pub fn render(program: &Program) -> String {
    let mut out = String::new();
    out.push_str("#include <stdio.h>\n");
    out.push_str("#define long long long\n");
    out.push_str("#define WriteLine() printf(\"\\n\");\n");
    out.push_str("#define WriteLong(x) printf(\" %lld\", (long)x);\n");
    out.push_str("#define ReadLong(a) if (fscanf(stdin, \"%lld\", &a) != 1) a = 0;\n");
    writeln!(out, "long REG[{}];", program.instruction_count + 4).unwrap();

    for global in &program.global_variables {
        out.push_str(&declaration(&global.name, global.size));
    }
    for function in &program.functions {
        out.push_str(&render_function(function));
    }
    out
}

fn declaration(name: &str, size: i64) -> String {
    if size > 8 {
        format!("long {}[{}];\n", name, size / 8)
    } else {
        format!("long {};\n", name)
    }
}

fn render_function(function: &Function) -> String {
    let mut out = String::new();
    let name = if function.is_main {
        "main".to_string()
    } else {
        format!("function_{}", function.id)
    };
    let params: Vec<String> = function
        .parameters
        .iter()
        .map(|p| format!("long {}", p.name))
        .collect();
    writeln!(out, "void {}({}) {{", name, params.join(", ")).unwrap();

    for local in &function.local_variables {
        out.push_str("  ");
        out.push_str(&declaration(&local.name, local.size));
    }
    for block in &function.blocks {
        out.push_str(&render_block(block));
    }
    out.push_str("}\n");
    out
}

fn render_block(block: &BasicBlock) -> String {
    let mut out = String::new();
    // Pending call arguments, queued by `param` statements and drained by
    // the `call` ending the block. Keeping the queue local to the block
    // rules out leakage between call sites.
    let mut arguments: Vec<String> = vec![];
    for instruction in &block.instructions {
        let body = statement(instruction, &mut arguments);
        let label = !instruction.predecessor_labels.is_empty();
        match (label, body) {
            (true, Some(body)) => {
                writeln!(out, "  inst_{}: {}", instruction.label, body).unwrap()
            }
            (true, None) => writeln!(out, "  inst_{}: ;", instruction.label).unwrap(),
            (false, Some(body)) => writeln!(out, "  {}", body).unwrap(),
            (false, None) => {}
        }
    }
    out
}

/// The statement for one instruction, or `None` for instructions with no
/// direct counterpart (`enter`, `param`, ...). `param` queues its operand
/// into `arguments`; `call` drains the queue.
fn statement(instruction: &Instruction, arguments: &mut Vec<String>) -> Option<String> {
    let ops = &instruction.operands;
    let reg = format!("REG[{}]", instruction.label);
    let line = match instruction.opcode {
        Opcode::Add => binary(&reg, ops, "+"),
        Opcode::Sub => binary(&reg, ops, "-"),
        Opcode::Mul => binary(&reg, ops, "*"),
        Opcode::Div => binary(&reg, ops, "/"),
        Opcode::Mod => binary(&reg, ops, "%"),
        Opcode::CmpEq => binary(&reg, ops, "=="),
        Opcode::CmpLe => binary(&reg, ops, "<="),
        Opcode::CmpLt => binary(&reg, ops, "<"),
        Opcode::Neg => format!("{} = -{};", reg, expr(&ops[0])),
        Opcode::Br => format!("goto {};", expr(&ops[0])),
        Opcode::Blbc => format!("if ({} == 0) goto {};", expr(&ops[0]), expr(&ops[1])),
        Opcode::Blbs => format!("if ({} != 0) goto {};", expr(&ops[0]), expr(&ops[1])),
        Opcode::Load => format!("{} = *((long *){});", reg, expr(&ops[0])),
        Opcode::Store => format!("*((long *){}) = {};", expr(&ops[1]), expr(&ops[0])),
        Opcode::Move => format!("{} = {};", expr(&ops[0]), expr(&ops[1])),
        Opcode::Read => format!("ReadLong({});", reg),
        Opcode::Write => format!("WriteLong({});", expr(&ops[0])),
        Opcode::Wrl => "WriteLine();".to_string(),
        Opcode::Param => {
            arguments.push(expr(&ops[0]));
            return None;
        }
        Opcode::Call => {
            let call = format!("{}({});", expr(&ops[0]), arguments.join(", "));
            arguments.clear();
            call
        }
        Opcode::Ret => "return;".to_string(),
        Opcode::Nop => ";".to_string(),
        Opcode::Assign => format!("{} = {};", reg, expr(&ops[0])),
        Opcode::Enter | Opcode::EntryPc => return None,
    };
    Some(line)
}

fn binary(reg: &str, ops: &[Operand], op: &str) -> String {
    format!("{} = {} {} {};", reg, expr(&ops[0]), op, expr(&ops[1]))
}

fn expr(operand: &Operand) -> String {
    match operand {
        // GP and FP only survive into codegen as dead address arithmetic.
        Operand::Gp | Operand::Fp => "0".to_string(),
        Operand::Constant(value) => value.to_string(),
        Operand::FieldOffset { offset, .. } => offset.to_string(),
        Operand::LocalVariable { name, .. }
        | Operand::GlobalVariable { name, .. }
        | Operand::Parameter { name, .. } => name.clone(),
        Operand::LocalAddress { name, .. } | Operand::GlobalAddress { name, .. } => {
            format!("(long)(&{})", name)
        }
        Operand::Register(reg) => format!("REG[{}]", reg),
        Operand::InstrLabel(label) => format!("inst_{}", label),
        Operand::FunctionId(id) => format!("function_{}", id),
    }
}
