//! Tabular feature derivation
//!
//! Maps task scores and the static health profile onto the frozen clinical
//! schema. Pure function of its inputs: the same assessment and profile
//! always yield the same vector. Defaults mirror the values the model was
//! trained with, so a sparse profile degrades to the population baseline
//! rather than skewing the prediction.

use cognia_core::domain::{Assessment, UserHealthProfile};
use cognia_core::schema::TabularFeatures;

/// Default age when the profile omits it (dataset range is 60-90).
const DEFAULT_AGE: f32 = 60.0;
/// Default sleep quality on the 0-10 scale.
const DEFAULT_SLEEP: f32 = 7.0;
/// Default physical activity on the 0-10 scale.
const DEFAULT_ACTIVITY: f32 = 5.0;
/// Default diet quality on the 0-10 scale.
const DEFAULT_DIET: f32 = 5.0;
/// BMI substituted when height/weight are absent or non-positive.
const DEFAULT_BMI: f32 = 25.0;
/// Memory score below which subjective complaints are assumed.
const MEMORY_COMPLAINT_THRESHOLD: f32 = 0.4;

fn flag(value: Option<bool>) -> f32 {
    value.map_or(0.0, |v| if v { 1.0 } else { 0.0 })
}

/// Build the tabular feature record for one assessment.
pub fn build(assessment: &Assessment, profile: &UserHealthProfile) -> TabularFeatures {
    let memory = assessment.memory_score.unwrap_or(0.0);
    let language = assessment.language_score.unwrap_or(0.0);
    let executive = assessment.executive_score.unwrap_or(0.0);

    // MMSE-equivalent: average of memory and language scaled to 0-30,
    // collapsing to 0 when both tasks scored zero or were skipped
    let global = if memory + language > 0.0 {
        (memory + language) / 2.0
    } else {
        0.0
    };
    let mmse = global * 30.0;

    // Functional assessment and ADL both proxy executive capacity
    let functional = executive * 10.0;
    let adl = executive * 10.0;

    let memory_complaints = if memory < MEMORY_COMPLAINT_THRESHOLD {
        1.0
    } else {
        0.0
    };

    let diabetes = flag(profile.diabetes);
    let hypertension = flag(profile.hypertension);
    let smoking = flag(profile.smoking);
    let cardiovascular_index = diabetes + hypertension + smoking;

    let sleep = profile.sleep_quality.unwrap_or(DEFAULT_SLEEP);
    let activity = profile.physical_activity.unwrap_or(DEFAULT_ACTIVITY);
    let lifestyle_deficit =
        (if sleep < 6.0 { 1.0 } else { 0.0 }) + (if activity < 4.0 { 1.0 } else { 0.0 });

    let bmi = match (profile.height_cm, profile.weight_kg) {
        (Some(height), Some(weight)) if height > 0.0 && weight > 0.0 => {
            let height_m = height / 100.0;
            (weight / (height_m * height_m)).clamp(10.0, 50.0)
        }
        _ => DEFAULT_BMI,
    };

    TabularFeatures {
        age: profile.age.map_or(DEFAULT_AGE, |a| a as f32),
        sex: profile.sex.map_or(0.0, f32::from),
        education: profile.education.map_or(0.0, f32::from),
        mmse,
        functional,
        memory_complaints,
        adl,
        family_history: flag(profile.family_history),
        head_injury: flag(profile.head_injury),
        depression: flag(profile.depression),
        cardiovascular_index,
        lifestyle_deficit,
        bmi,
        alcohol_per_week: profile.alcohol_per_week.unwrap_or(0.0),
        diet_quality: profile.diet_quality.unwrap_or(DEFAULT_DIET),
        raw_memory: memory,
        raw_executive: executive,
        raw_sleep_quality: sleep,
        raw_physical_activity: activity,
    }
}
