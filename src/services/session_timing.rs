use time::{Duration, PrimitiveDateTime};

use crate::db::types::Question;

/// Max score snapshotted onto a session at start time.
pub(crate) fn max_score(questions: &[Question]) -> f64 {
    questions.iter().map(|question| question.points() as f64).sum()
}

pub(crate) fn session_deadline(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
) -> PrimitiveDateTime {
    started_at + Duration::minutes(duration_minutes as i64)
}

/// A session expires strictly after its deadline; a write arriving exactly
/// at the deadline is still in time.
pub(crate) fn has_expired(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> bool {
    now > session_deadline(started_at, duration_minutes)
}

/// Whole minutes elapsed since the session started, clamped at zero.
pub(crate) fn elapsed_minutes(started_at: PrimitiveDateTime, now: PrimitiveDateTime) -> i32 {
    let elapsed = (now - started_at).whole_minutes();
    elapsed.max(0) as i32
}

pub(crate) fn remaining_seconds(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> i64 {
    let remaining = (session_deadline(started_at, duration_minutes) - now).whole_seconds();
    remaining.max(0)
}

/// Zero-question assessments have max score 0; their percentage is defined
/// as 0 rather than a division by zero.
pub(crate) fn percentage(total_score: f64, max_score: f64) -> i32 {
    if max_score > 0.0 {
        (total_score / max_score * 100.0).round() as i32
    } else {
        0
    }
}
