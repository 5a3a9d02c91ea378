//! Arithmetic and comparison primitives

use std::cmp::Ordering;

use super::Primitive;
use crate::interpreter::executor::errors::UserError;
use crate::interpreter::executor::types::Slot;
use crate::interpreter::tree::Immediate;

/// Numeric operands after promotion
enum Nums {
    Int(i64, i64),
    Float(f64, f64),
}

fn numbers(op: &str, a: &Slot, b: &Slot) -> Result<Nums, UserError> {
    match (a.read()?, b.read()?) {
        (Slot::Immediate(Immediate::Int(x)), Slot::Immediate(Immediate::Int(y))) => {
            Ok(Nums::Int(*x, *y))
        }
        (Slot::Immediate(Immediate::Int(x)), Slot::Immediate(Immediate::Float(y))) => {
            Ok(Nums::Float(*x as f64, *y))
        }
        (Slot::Immediate(Immediate::Float(x)), Slot::Immediate(Immediate::Int(y))) => {
            Ok(Nums::Float(*x, *y as f64))
        }
        (Slot::Immediate(Immediate::Float(x)), Slot::Immediate(Immediate::Float(y))) => {
            Ok(Nums::Float(*x, *y))
        }
        (x, y) => Err(UserError::TypeMismatch(format!(
            "cannot apply '{}' to {} and {}",
            op,
            x.kind_name(),
            y.kind_name()
        ))),
    }
}

/// `+` also concatenates strings
pub fn add(a: &Slot, b: &Slot) -> Result<Slot, UserError> {
    if let (Slot::Immediate(Immediate::Str(x)), Slot::Immediate(Immediate::Str(y))) = (a, b) {
        return Ok(Slot::Immediate(Immediate::Str(format!("{}{}", x, y))));
    }
    arith(Primitive::Add, a, b)
}

pub fn arith(prim: Primitive, a: &Slot, b: &Slot) -> Result<Slot, UserError> {
    let overflow = || UserError::TypeMismatch(format!("integer overflow in '{}'", prim.name()));

    match numbers(prim.name(), a, b)? {
        Nums::Int(x, y) => {
            let v = match prim {
                Primitive::Add => x.checked_add(y).ok_or_else(overflow)?,
                Primitive::Sub => x.checked_sub(y).ok_or_else(overflow)?,
                Primitive::Mul => x.checked_mul(y).ok_or_else(overflow)?,
                Primitive::Div | Primitive::Rem if y == 0 => return Err(UserError::DivisionByZero),
                Primitive::Div => x.checked_div(y).ok_or_else(overflow)?,
                Primitive::Rem => x.checked_rem(y).ok_or_else(overflow)?,
                _ => unreachable!("{:?} is not arithmetic", prim),
            };
            Ok(Slot::int(v))
        }
        Nums::Float(x, y) => {
            let v = match prim {
                Primitive::Add => x + y,
                Primitive::Sub => x - y,
                Primitive::Mul => x * y,
                Primitive::Div => x / y,
                Primitive::Rem => x % y,
                _ => unreachable!("{:?} is not arithmetic", prim),
            };
            Ok(Slot::Immediate(Immediate::Float(v)))
        }
    }
}

pub fn compare(prim: Primitive, a: &Slot, b: &Slot) -> Result<Slot, UserError> {
    let ordering = match (a.read()?, b.read()?) {
        (Slot::Immediate(Immediate::Str(x)), Slot::Immediate(Immediate::Str(y))) => Some(x.cmp(y)),
        _ => match numbers(prim.name(), a, b)? {
            Nums::Int(x, y) => Some(x.cmp(&y)),
            Nums::Float(x, y) => x.partial_cmp(&y),
        },
    };

    // NaN compares false under every ordering
    let result = ordering.is_some_and(|o| match prim {
        Primitive::Lt => o == Ordering::Less,
        Primitive::Le => o != Ordering::Greater,
        Primitive::Gt => o == Ordering::Greater,
        Primitive::Ge => o != Ordering::Less,
        _ => false,
    });
    Ok(Slot::bool(result))
}

pub fn equal(a: &Slot, b: &Slot) -> Result<bool, UserError> {
    let (a, b) = (a.read()?, b.read()?);
    Ok(match numbers("==", a, b) {
        Ok(Nums::Int(x, y)) => x == y,
        Ok(Nums::Float(x, y)) => x == y,
        Err(_) => a == b,
    })
}
