//! Output and object-constructing primitives

use std::io::Write;

use super::NativeCx;
use crate::interpreter::executor::errors::UserError;
use crate::interpreter::executor::forall::RANGE_TYPE;
use crate::interpreter::executor::types::{Heap, Object, Slot};

/// print(x) - write one value and a newline to the run's output
pub fn print(value: &Slot, cx: &mut NativeCx<'_>) -> Result<Slot, UserError> {
    let text = render(cx.heap, value.read()?);
    writeln!(cx.out, "{}", text).map_err(|e| UserError::Output(e.to_string()))?;
    Ok(Slot::Empty)
}

/// range(lo, hi) - half-open integer range object, iterable with forall
pub fn range(lo: &Slot, hi: &Slot, cx: &mut NativeCx<'_>) -> Result<Slot, UserError> {
    let (lo, hi) = (lo.as_int()?, hi.as_int()?);
    let r = cx.heap.alloc(Object {
        ty: RANGE_TYPE.to_string(),
        fields: vec![Slot::int(lo), Slot::int(hi)],
    });
    Ok(Slot::Object(r))
}

/// Text form of a slot, following object fields one level deep
pub fn render(heap: &Heap, value: &Slot) -> String {
    match value {
        Slot::Object(r) => match heap.get(*r) {
            Some(object) => {
                let fields: Vec<String> = object.fields.iter().map(|f| f.to_string()).collect();
                format!("{}({})", object.ty, fields.join(", "))
            }
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}
