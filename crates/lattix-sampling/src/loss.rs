//! Pairwise losses over positive and negative scores.
//!
//! Both reduce by sum. Scores are `f32` tensors of matching shape, typically
//! one negative per positive as produced by a sampler with `n_neg = 1`.

use crate::error::{Error, Result};
use candle_core::Tensor;

fn check_shapes(pos: &Tensor, neg: &Tensor) -> Result<()> {
    if pos.dims() != neg.dims() {
        return Err(Error::LengthMismatch {
            expected: pos.elem_count(),
            got: neg.elem_count(),
        });
    }
    Ok(())
}

/// `sum(max(0, margin - pos + neg))`.
pub fn margin_loss(pos: &Tensor, neg: &Tensor, margin: f64) -> Result<Tensor> {
    check_shapes(pos, neg)?;
    let gap = ((neg - pos)? + margin)?;
    Ok(gap.relu()?.sum_all()?)
}

/// `sum(log(1 + exp(-pos))) + sum(log(1 + exp(neg)))`.
pub fn logistic_loss(pos: &Tensor, neg: &Tensor) -> Result<Tensor> {
    check_shapes(pos, neg)?;
    let pos_term = softplus(&pos.neg()?)?.sum_all()?;
    let neg_term = softplus(neg)?.sum_all()?;
    Ok((pos_term + neg_term)?)
}

/// `log(1 + exp(x))` computed as `max(x, 0) + log(1 + exp(-|x|))`.
fn softplus(x: &Tensor) -> Result<Tensor> {
    let tail = ((x.abs()?.neg()?.exp()? + 1.0)?).log()?;
    Ok((x.relu()? + tail)?)
}
