//! Expression compilation
//!
//! Every expression leaves exactly one value on the operand stack, except
//! calls compiled with `discard`, which leave none.

use super::Compiler;
use super::bytecode::{ObjPropKind, Op};
use crate::ast::{
    ArrayExpression, AssignmentExpression, BinaryOp, CallExpression, Expression, Literal,
    LiteralValue, LogicalExpression, LogicalOp, MemberExpression, MemberProperty,
    NewExpression, ObjectExpression, PropertyKind, UnaryExpression, UnaryOp, UpdateExpression,
};
use crate::error::{ErrorCode, JsError};
use crate::lexer::Span;
use crate::value::{CheapClone, JsString};

impl<'a> Compiler<'a> {
    /// Compile an expression, leaving its value on the stack
    pub(super) fn compile_expression(&mut self, expr: &'a Expression) -> Result<(), JsError> {
        match expr {
            Expression::Literal(lit) => {
                self.compile_literal(lit);
                Ok(())
            }

            Expression::Array(arr) => self.compile_array(arr),

            Expression::Object(obj) => self.compile_object(obj),

            Expression::Function(literal) => {
                let id = self.function_id(literal);
                self.emit_at(literal.span, Op::Func { id });
                Ok(())
            }

            Expression::Identifier(ident) => {
                match self.local_slot(&ident.name) {
                    Some(slot) => self.emit_at(ident.span, Op::Local { slot }),
                    None => self.emit_at(
                        ident.span,
                        Op::Ident {
                            name: ident.name.cheap_clone(),
                        },
                    ),
                }
                Ok(())
            }

            Expression::This(_) => {
                self.builder.emit(Op::This);
                Ok(())
            }

            Expression::Unary(unary) => self.compile_unary(unary),

            Expression::Binary(binary) => {
                self.compile_expression(&binary.left)?;
                self.compile_expression(&binary.right)?;
                self.emit_at(binary.span, binary_op(binary.operator));
                Ok(())
            }

            Expression::Logical(logical) => self.compile_logical(logical),

            Expression::Conditional(cond) => {
                self.compile_expression(&cond.test)?;
                let else_label = self.builder.new_label();
                let end_label = self.builder.new_label();
                self.builder.emit(Op::JmpZ {
                    target: else_label.id(),
                });
                self.compile_expression(&cond.consequent)?;
                self.builder.emit(Op::Jmp {
                    target: end_label.id(),
                });
                self.builder.bind_label(else_label);
                self.compile_expression(&cond.alternate)?;
                self.builder.bind_label(end_label);
                Ok(())
            }

            Expression::Assignment(assign) => self.compile_assignment(assign),

            Expression::Update(update) => self.compile_update(update),

            Expression::Sequence(seq) => {
                let count = seq.expressions.len();
                for (i, expr) in seq.expressions.iter().enumerate() {
                    self.compile_expression(expr)?;
                    if i + 1 < count {
                        self.builder.emit(Op::Pop { count: 1 });
                    }
                }
                if count == 0 {
                    self.builder.emit(Op::Undefined);
                }
                Ok(())
            }

            Expression::Member(member) => self.compile_member(member),

            Expression::Call(call) => self.compile_call(call, false),

            Expression::New(new) => self.compile_new(new),
        }
    }

    /// Emit `op` tagged with the start of `span`
    fn emit_at(&mut self, span: Span, op: Op) {
        self.builder.set_loc(span.start);
        self.builder.emit(op);
    }

    fn compile_literal(&mut self, lit: &Literal) {
        let op = match &lit.value {
            LiteralValue::Null => Op::Null,
            LiteralValue::Boolean(b) => Op::Bool(*b),
            LiteralValue::Number(n) => number_op(*n),
            LiteralValue::String(s) => Op::Str(s.cheap_clone()),
            LiteralValue::RegExp { pattern, flags } => Op::RegExp {
                pattern: JsString::from(pattern.as_str()),
                flags: JsString::from(flags.as_str()),
            },
        };
        self.emit_at(lit.span, op);
    }

    fn compile_array(&mut self, arr: &'a ArrayExpression) -> Result<(), JsError> {
        self.emit_at(
            arr.span,
            Op::CArray {
                length: arr.elements.len() as u32,
            },
        );
        for (index, element) in arr.elements.iter().enumerate() {
            let Some(element) = element else {
                continue;
            };
            self.compile_expression(element)?;
            self.builder.emit(Op::ArrayElem {
                index: index as u32,
            });
        }
        Ok(())
    }

    fn compile_object(&mut self, obj: &'a ObjectExpression) -> Result<(), JsError> {
        self.emit_at(obj.span, Op::NewObj);
        for prop in &obj.properties {
            self.compile_expression(&prop.value)?;
            let kind = match prop.kind {
                PropertyKind::Init => ObjPropKind::Init,
                PropertyKind::Get => ObjPropKind::Getter,
                PropertyKind::Set => ObjPropKind::Setter,
            };
            self.emit_at(
                prop.span,
                Op::ObjProp {
                    name: prop.key.cheap_clone(),
                    kind,
                },
            );
        }
        Ok(())
    }

    fn compile_unary(&mut self, unary: &'a UnaryExpression) -> Result<(), JsError> {
        match unary.operator {
            UnaryOp::Typeof => {
                if let Expression::Identifier(ident) = unary.argument.as_ref()
                    && self.local_slot(&ident.name).is_none()
                {
                    self.emit_at(
                        unary.span,
                        Op::TypeofIdent {
                            name: ident.name.cheap_clone(),
                        },
                    );
                    return Ok(());
                }
                self.compile_expression(&unary.argument)?;
                self.builder.emit(Op::Typeof);
            }
            UnaryOp::Delete => match unary.argument.as_ref() {
                Expression::Identifier(ident) => {
                    self.emit_at(
                        unary.span,
                        Op::DeleteIdent {
                            name: ident.name.cheap_clone(),
                        },
                    );
                }
                Expression::Member(_) => {
                    self.compile_ref(&unary.argument)?;
                    self.emit_at(unary.span, Op::Delete);
                }
                other => {
                    self.compile_expression(other)?;
                    self.builder.emit(Op::Pop { count: 1 });
                    self.builder.emit(Op::Bool(true));
                }
            },
            op => {
                self.compile_expression(&unary.argument)?;
                let op = match op {
                    UnaryOp::Minus => Op::Neg,
                    UnaryOp::Plus => Op::ToNumber,
                    UnaryOp::Not => Op::Not,
                    UnaryOp::BitNot => Op::BitNot,
                    _ => Op::Void,
                };
                self.emit_at(unary.span, op);
            }
        }
        Ok(())
    }

    fn compile_logical(&mut self, logical: &'a LogicalExpression) -> Result<(), JsError> {
        self.compile_expression(&logical.left)?;
        let end_label = self.builder.new_label();
        let op = match logical.operator {
            LogicalOp::Or => Op::CndNz {
                target: end_label.id(),
            },
            LogicalOp::And => Op::CndZ {
                target: end_label.id(),
            },
        };
        self.builder.emit(op);
        self.compile_expression(&logical.right)?;
        self.builder.bind_label(end_label);
        Ok(())
    }

    fn compile_assignment(&mut self, assign: &'a AssignmentExpression) -> Result<(), JsError> {
        if !self.compile_ref(&assign.left)? {
            // `f() = 1` parses but always fails when it runs
            self.builder.emit(Op::Pop { count: 1 });
            self.emit_at(
                assign.span,
                Op::ThrowRef {
                    code: ErrorCode::ILLEGAL_ASSIGN,
                },
            );
            self.builder.emit(Op::Undefined);
            return Ok(());
        }
        if let Some(operator) = assign.operator {
            self.builder.emit(Op::RefVal);
            self.compile_expression(&assign.right)?;
            self.emit_at(assign.span, binary_op(operator));
        } else {
            self.compile_expression(&assign.right)?;
        }
        self.emit_at(assign.span, Op::Assign);
        Ok(())
    }

    fn compile_update(&mut self, update: &'a UpdateExpression) -> Result<(), JsError> {
        if !self.compile_ref(&update.argument)? {
            self.builder.emit(Op::Pop { count: 1 });
            self.emit_at(
                update.span,
                Op::ThrowRef {
                    code: ErrorCode::ILLEGAL_ASSIGN,
                },
            );
            self.builder.emit(Op::Undefined);
            return Ok(());
        }
        let delta = if update.increment { 1 } else { -1 };
        let op = if update.prefix {
            Op::PreInc { delta }
        } else {
            Op::PostInc { delta }
        };
        self.emit_at(update.span, op);
        Ok(())
    }

    fn compile_member(&mut self, member: &'a MemberExpression) -> Result<(), JsError> {
        self.compile_expression(&member.object)?;
        match &member.property {
            MemberProperty::Identifier(ident) => {
                self.emit_at(
                    member.span,
                    Op::Member {
                        name: ident.name.cheap_clone(),
                    },
                );
            }
            MemberProperty::Expression(key) => {
                self.compile_expression(key)?;
                self.emit_at(member.span, Op::Index);
            }
        }
        Ok(())
    }

    /// Compile a call. With `discard` the result is dropped by the call itself.
    pub(super) fn compile_call(&mut self, call: &'a CallExpression, discard: bool) -> Result<(), JsError> {
        let argc = call.arguments.len() as u32;
        let through_ref = matches!(
            call.callee.as_ref(),
            Expression::Identifier(_) | Expression::Member(_)
        );
        if through_ref {
            self.compile_ref(&call.callee)?;
        } else {
            self.compile_expression(&call.callee)?;
        }
        for arg in &call.arguments {
            self.compile_expression(arg)?;
        }
        let op = if through_ref {
            Op::CallMember { argc, discard }
        } else {
            Op::Call { argc, discard }
        };
        self.emit_at(call.span, op);
        Ok(())
    }

    fn compile_new(&mut self, new: &'a NewExpression) -> Result<(), JsError> {
        self.compile_expression(&new.callee)?;
        for arg in &new.arguments {
            self.compile_expression(arg)?;
        }
        self.emit_at(
            new.span,
            Op::New {
                argc: new.arguments.len() as u32,
            },
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // References
    // ═══════════════════════════════════════════════════════════════════════════

    /// Push a two-cell reference for an identifier
    pub(super) fn compile_name_ref(&mut self, name: &JsString) {
        match self.local_slot(name) {
            Some(slot) => {
                self.builder.emit(Op::LocalRef { slot });
            }
            None => {
                self.builder.emit(Op::IdentRef {
                    name: name.cheap_clone(),
                });
            }
        }
    }

    /// Push a reference for `expr` when it is a valid assignment target.
    /// Otherwise evaluate it, leaving one value, and return false.
    pub(super) fn compile_ref(&mut self, expr: &'a Expression) -> Result<bool, JsError> {
        match expr {
            Expression::Identifier(ident) => {
                self.builder.set_loc(ident.span.start);
                self.compile_name_ref(&ident.name);
                Ok(true)
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                match &member.property {
                    MemberProperty::Identifier(ident) => {
                        self.emit_at(
                            member.span,
                            Op::MemberRef {
                                name: ident.name.cheap_clone(),
                            },
                        );
                    }
                    MemberProperty::Expression(key) => {
                        self.compile_expression(key)?;
                        self.emit_at(member.span, Op::IndexRef);
                    }
                }
                Ok(true)
            }
            other => {
                self.compile_expression(other)?;
                Ok(false)
            }
        }
    }
}

/// Literal numbers use the int32 form when it is exact
fn number_op(n: f64) -> Op {
    let is_int = n.fract() == 0.0
        && n >= f64::from(i32::MIN)
        && n <= f64::from(i32::MAX)
        && !(n == 0.0 && n.is_sign_negative());
    if is_int { Op::Int(n as i32) } else { Op::Double(n) }
}

fn binary_op(op: BinaryOp) -> Op {
    match op {
        BinaryOp::Add => Op::Add,
        BinaryOp::Sub => Op::Sub,
        BinaryOp::Mul => Op::Mul,
        BinaryOp::Div => Op::Div,
        BinaryOp::Mod => Op::Mod,
        BinaryOp::Eq => Op::Eq,
        BinaryOp::NotEq => Op::NotEq,
        BinaryOp::StrictEq => Op::StrictEq,
        BinaryOp::StrictNotEq => Op::StrictNotEq,
        BinaryOp::Lt => Op::Lt,
        BinaryOp::LtEq => Op::LtEq,
        BinaryOp::Gt => Op::Gt,
        BinaryOp::GtEq => Op::GtEq,
        BinaryOp::BitAnd => Op::BitAnd,
        BinaryOp::BitOr => Op::BitOr,
        BinaryOp::BitXor => Op::BitXor,
        BinaryOp::LShift => Op::LShift,
        BinaryOp::RShift => Op::RShift,
        BinaryOp::URShift => Op::URShift,
        BinaryOp::In => Op::In,
        BinaryOp::Instanceof => Op::Instanceof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_literal_forms() {
        assert_eq!(number_op(42.0), Op::Int(42));
        assert_eq!(number_op(-0.0), Op::Double(-0.0));
        assert_eq!(number_op(1.5), Op::Double(1.5));
        assert_eq!(number_op(4294967296.0), Op::Double(4294967296.0));
    }
}
