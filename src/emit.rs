use crate::assembly::{Instruction, Operand, Program, Register};

/// A structure that implements this trait can render itself as NASM
/// assembly text.
pub trait EmitAsm {
    /// The indent_depth argument only needs to be used when you have to
    /// indent something.
    fn emit(&self, indent_depth: u32) -> String;
}

impl Register {
    fn emit(&self) -> &'static str {
        match self {
            Register::Rax => "rax",
            Register::Rbx => "rbx",
            Register::Rdx => "rdx",
            Register::Rdi => "rdi",
        }
    }
}

impl Operand {
    fn emit(&self) -> String {
        match self {
            Operand::Register(reg) => reg.emit().to_owned(),
            Operand::Imm(val) => format!("{}", val),
            Operand::Stack(offset) => format!("QWORD [rsp + {}]", offset),
        }
    }
}

impl EmitAsm for Instruction {
    fn emit(&self, indent_depth: u32) -> String {
        let tabs = "\t".repeat(indent_depth as usize);

        match self {
            Instruction::Mov { dst, src } => {
                format!("{}mov {}, {}\n", tabs, dst.emit(), src.emit())
            }
            Instruction::Push(operand) => format!("{}push {}\n", tabs, operand.emit()),
            Instruction::Pop(operand) => format!("{}pop {}\n", tabs, operand.emit()),
            Instruction::Add { dst, src } => {
                format!("{}add {}, {}\n", tabs, dst.emit(), src.emit())
            }
            Instruction::Sub { dst, src } => {
                format!("{}sub {}, {}\n", tabs, dst.emit(), src.emit())
            }
            Instruction::Mul(reg) => format!("{}mul {}\n", tabs, reg.emit()),
            Instruction::Div(reg) => format!("{}div {}\n", tabs, reg.emit()),
            Instruction::Xor { dst, src } => {
                format!("{}xor {}, {}\n", tabs, dst.emit(), src.emit())
            }
            Instruction::Test { lhs, rhs } => {
                format!("{}test {}, {}\n", tabs, lhs.emit(), rhs.emit())
            }
            Instruction::Jz(label) => format!("{}jz .L{}\n", tabs, label),
            Instruction::Jmp(label) => format!("{}jmp .L{}\n", tabs, label),
            Instruction::Label(label) => format!(".L{}:\n", label),
            Instruction::DeallocateStack(bytes) => format!("{}add rsp, {}\n", tabs, *bytes),
            Instruction::Syscall => format!("{}syscall\n", tabs),
        }
    }
}

impl EmitAsm for Program {
    fn emit(&self, indent_depth: u32) -> String {
        let tabs = "\t".repeat(indent_depth as usize);

        format!(
            "{}global _start\n_start:\n{}",
            tabs,
            self.0
                .iter()
                .map(|inst| inst.emit(indent_depth + 1))
                .collect::<String>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_text() {
        assert_eq!(
            Instruction::Mov {
                dst: Operand::Register(Register::Rax),
                src: Operand::Imm(60),
            }
            .emit(1),
            "\tmov rax, 60\n"
        );
        assert_eq!(
            Instruction::Push(Operand::Stack(16)).emit(1),
            "\tpush QWORD [rsp + 16]\n"
        );
        assert_eq!(Instruction::Jz("else0".to_owned()).emit(1), "\tjz .Lelse0\n");
        assert_eq!(Instruction::Label("end1".to_owned()).emit(1), ".Lend1:\n");
        assert_eq!(Instruction::DeallocateStack(24).emit(1), "\tadd rsp, 24\n");
    }

    #[test]
    fn test_program_prologue() {
        let program = Program(vec![
            Instruction::Mov {
                dst: Operand::Register(Register::Rax),
                src: Operand::Imm(60),
            },
            Instruction::Mov {
                dst: Operand::Register(Register::Rdi),
                src: Operand::Imm(0),
            },
            Instruction::Syscall,
        ]);

        assert_eq!(
            program.emit(0),
            "global _start\n_start:\n\tmov rax, 60\n\tmov rdi, 0\n\tsyscall\n"
        );
    }
}
