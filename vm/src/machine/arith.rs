use crate::error::Fault;
use crate::opcode::BinOp;
use crate::value::Value;
use memory::Comp4;

use super::stack::StackOps;

/// Trait for the `BinaryOp` instruction handler
pub trait ArithmeticOps {
    fn handle_binary(&mut self, selector: i8) -> Result<(), Fault>;
}

impl ArithmeticOps for super::vm::Machine {
    fn handle_binary(&mut self, selector: i8) -> Result<(), Fault> {
        let op = BinOp::from_u8(selector as u8)
            .ok_or_else(|| Fault::InvalidOperand(format!("binary selector {}", selector)))?;

        let rhs = self.pop()?;
        let lhs = self.pop()?;

        let result = match (&lhs, &rhs) {
            (Value::Comp4(a), Value::Comp4(b)) => comp4_binary(op, a, b)?,
            (Value::Comp2(a), Value::Comp2(b)) => comp2_binary(op, *a, *b),
            _ => {
                return Err(Fault::TypeMismatch(format!(
                    "{:?} on {} and {}",
                    op,
                    lhs.kind_name(),
                    rhs.kind_name()
                )));
            }
        };

        self.push(result)
    }
}

/// Exact fixed-point arithmetic; both operands must carry the same
/// declaration, and a lossy result is a fault rather than a truncation.
fn comp4_binary(op: BinOp, a: &Comp4, b: &Comp4) -> Result<Value, Fault> {
    if op.is_comparison() {
        let ord = a.compare(b)?;
        let truth = match op {
            BinOp::Eq => ord.is_eq(),
            BinOp::Ne => ord.is_ne(),
            BinOp::Lt => ord.is_lt(),
            BinOp::Le => ord.is_le(),
            BinOp::Gt => ord.is_gt(),
            BinOp::Ge => ord.is_ge(),
            _ => unreachable!(),
        };
        return Ok(Value::Comp4(Comp4::flag(truth)));
    }

    let value = match op {
        BinOp::Add => a.checked_add(b)?,
        BinOp::Sub => a.checked_sub(b)?,
        BinOp::Mul => a.checked_mul(b)?,
        BinOp::Div => a.checked_div(b)?,
        _ => unreachable!(),
    };
    Ok(Value::Comp4(value))
}

/// Binary floating arithmetic; IEEE semantics, no exactness guarantees.
fn comp2_binary(op: BinOp, a: f64, b: f64) -> Value {
    if op.is_comparison() {
        let truth = match op {
            BinOp::Eq => a == b,
            BinOp::Ne => a != b,
            BinOp::Lt => a < b,
            BinOp::Le => a <= b,
            BinOp::Gt => a > b,
            BinOp::Ge => a >= b,
            _ => unreachable!(),
        };
        return Value::Comp4(Comp4::flag(truth));
    }

    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        _ => unreachable!(),
    };
    Value::Comp2(value)
}
