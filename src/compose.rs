//! Response composition
//!
//! Pure transform from detection results to the user-facing message.
//! Deterministic from its inputs; the primary unit-testable surface.

use std::fmt::Write;

use crate::analysis::Face;

/// Build the final spoken/displayed message for a session
///
/// Each face with known attributes contributes a phrase naming gender and
/// age (rounded to a whole number); a trailing phrase always states the
/// total face count and the location label.
#[must_use]
pub fn compose_message(faces: &[Face], location: &str) -> String {
    let mut out = String::new();

    for face in faces {
        if let Some(attrs) = &face.attributes {
            let _ = write!(
                out,
                "There is a {} age {}. ",
                attrs.gender,
                attrs.age.round()
            );
        }
    }

    let _ = write!(
        out,
        "There are a total of {} persons in {}.",
        faces.len(),
        location
    );

    out
}
