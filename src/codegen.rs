use thiserror::Error;

use crate::{
    assembly::{Instruction, Label, Operand, Program, Register},
    ast::{self, BinaryOperator, Block, ElseBranch, Expression, Statement},
};

#[derive(Error, Debug, Eq, PartialEq)]
pub enum CodegenError {
    #[error("Variable {0} was redeclared in the same scope")]
    VariableRedeclaration(String),
    #[error("Variable {0} was not declared in this scope")]
    UndeclaredVariable(String),
}

pub fn generate(program: &ast::Program) -> Result<Program, CodegenError> {
    Generator::default().gen_program(program)
}

#[derive(Debug)]
struct Variable {
    name: String,
    /// Index of the variable's slot, counted from the bottom of the
    /// runtime stack.
    stack_loc: usize,
}

/// Lowers the AST to stack-machine instructions. Every expression leaves
/// exactly one value on the runtime stack; `stack_size` mirrors the depth
/// the emitted code will have at runtime, which is what makes
/// `[rsp + offset]` addressing of variables work.
#[derive(Debug, Default)]
struct Generator {
    instructions: Vec<Instruction>,
    stack_size: usize,
    variables: Vec<Variable>,
    scopes: Vec<usize>,
    label_count: usize,
}

impl Generator {
    fn gen_program(mut self, program: &ast::Program) -> Result<Program, CodegenError> {
        for statement in &program.statements {
            self.gen_statement(statement)?;
        }

        // Programs that fall off the end exit with status 0.
        self.instructions.push(Instruction::Mov {
            dst: Operand::Register(Register::Rax),
            src: Operand::Imm(60),
        });
        self.instructions.push(Instruction::Mov {
            dst: Operand::Register(Register::Rdi),
            src: Operand::Imm(0),
        });
        self.instructions.push(Instruction::Syscall);

        Ok(Program(self.instructions))
    }

    fn gen_statement(&mut self, statement: &Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::Exit(expression) => {
                self.gen_expression(expression)?;
                self.instructions.push(Instruction::Mov {
                    dst: Operand::Register(Register::Rax),
                    src: Operand::Imm(60),
                });
                self.pop(Register::Rdi);
                self.instructions.push(Instruction::Syscall);
            }
            Statement::Let { name, init } => {
                let scope_start = self.scopes.last().copied().unwrap_or(0);
                if self.variables[scope_start..]
                    .iter()
                    .any(|variable| variable.name == *name)
                {
                    return Err(CodegenError::VariableRedeclaration(name.clone()));
                }
                self.gen_expression(init)?;
                self.variables.push(Variable {
                    name: name.clone(),
                    stack_loc: self.stack_size - 1,
                });
            }
            Statement::Compound(block) => self.gen_block(block)?,
            Statement::If(chain) => self.gen_if(chain)?,
        }
        Ok(())
    }

    fn gen_expression(&mut self, expression: &Expression) -> Result<(), CodegenError> {
        match expression {
            Expression::IntLiteral(value) => {
                self.instructions.push(Instruction::Mov {
                    dst: Operand::Register(Register::Rax),
                    src: Operand::Imm(*value),
                });
                self.push(Operand::Register(Register::Rax));
            }
            Expression::Var(name) => {
                // Innermost binding wins, which is what makes shadowing in
                // nested scopes resolve correctly.
                let variable = self
                    .variables
                    .iter()
                    .rev()
                    .find(|variable| variable.name == *name)
                    .ok_or_else(|| CodegenError::UndeclaredVariable(name.clone()))?;
                let offset = (self.stack_size - variable.stack_loc - 1) * 8;
                self.push(Operand::Stack(offset));
            }
            Expression::Binary { op, lhs, rhs } => {
                self.gen_expression(lhs)?;
                self.gen_expression(rhs)?;
                self.pop(Register::Rbx);
                self.pop(Register::Rax);
                match op {
                    BinaryOperator::Add => self.instructions.push(Instruction::Add {
                        dst: Register::Rax,
                        src: Register::Rbx,
                    }),
                    BinaryOperator::Subtract => self.instructions.push(Instruction::Sub {
                        dst: Register::Rax,
                        src: Register::Rbx,
                    }),
                    BinaryOperator::Multiply => {
                        self.instructions.push(Instruction::Mul(Register::Rbx))
                    }
                    BinaryOperator::Divide => {
                        // div takes the dividend from rdx:rax.
                        self.instructions.push(Instruction::Xor {
                            dst: Register::Rdx,
                            src: Register::Rdx,
                        });
                        self.instructions.push(Instruction::Div(Register::Rbx));
                    }
                }
                self.push(Operand::Register(Register::Rax));
            }
        }
        Ok(())
    }

    fn gen_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.begin_scope();
        for statement in &block.0 {
            self.gen_statement(statement)?;
        }
        self.end_scope();
        Ok(())
    }

    fn gen_if(&mut self, chain: &ast::If) -> Result<(), CodegenError> {
        let end_label = self.create_label("end");
        self.gen_if_clause(chain, &end_label)?;
        self.instructions.push(Instruction::Label(end_label));
        Ok(())
    }

    fn gen_if_clause(&mut self, clause: &ast::If, end_label: &str) -> Result<(), CodegenError> {
        let next_label = self.create_label("else");

        self.gen_expression(&clause.condition)?;
        self.pop(Register::Rax);
        self.instructions.push(Instruction::Test {
            lhs: Register::Rax,
            rhs: Register::Rax,
        });
        self.instructions.push(Instruction::Jz(next_label.clone()));
        self.gen_block(&clause.then)?;
        self.instructions.push(Instruction::Jmp(end_label.to_owned()));
        self.instructions.push(Instruction::Label(next_label));

        match &clause.otherwise {
            Some(ElseBranch::Elif(elif)) => self.gen_if_clause(elif, end_label)?,
            Some(ElseBranch::Else(block)) => self.gen_block(block)?,
            None => {}
        }
        Ok(())
    }

    fn begin_scope(&mut self) {
        self.scopes.push(self.variables.len());
    }

    fn end_scope(&mut self) {
        let marker = self.scopes.pop().expect("scope stack should never underflow");
        let pop_count = self.variables.len() - marker;
        if pop_count > 0 {
            self.instructions
                .push(Instruction::DeallocateStack(pop_count * 8));
            self.stack_size -= pop_count;
            self.variables.truncate(marker);
        }
    }

    fn push(&mut self, operand: Operand) {
        self.instructions.push(Instruction::Push(operand));
        self.stack_size += 1;
    }

    fn pop(&mut self, register: Register) {
        self.instructions
            .push(Instruction::Pop(Operand::Register(register)));
        self.stack_size -= 1;
    }

    fn create_label(&mut self, prefix: &str) -> Label {
        let label = format!("{}{}", prefix, self.label_count);
        self.label_count += 1;
        label
    }
}
