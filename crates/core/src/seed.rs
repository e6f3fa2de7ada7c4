//! Demo data for development and demonstrations.
//!
//! Creates four staff accounts (all with password `password123`), two doctor profiles, and a
//! ward of 37 patients spread across four clinical pictures, each with a handful of vital
//! signs and a standard sepsis lab panel.

use crate::doctor::{ContactInfo, NewDoctor};
use crate::labs::{Biomarkers, LabReading, NewLabResult};
use crate::patient::{Department, Gender, NewPatient, PatientStatus};
use crate::risk::{RiskLevel, RiskScore};
use crate::services::{DoctorService, PatientService, UserService};
use crate::user::{Registration, Role, User};
use crate::vitals::NewVitalSigns;
use crate::CoreResult;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use sepshield_types::{EmailAddress, NonEmptyText};
use sepshield_uuid::RecordId;
use std::collections::HashSet;

pub const DEMO_PASSWORD: &str = "password123";

const FIRST_NAMES: [&str; 20] = [
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "William",
    "Elizabeth", "David", "Susan", "Richard", "Jessica", "Joseph", "Sarah", "Thomas", "Karen",
    "Charles", "Nancy",
];

const LAST_NAMES: [&str; 20] = [
    "Smith", "Johnson", "Williams", "Jones", "Brown", "Davis", "Miller", "Wilson", "Moore",
    "Taylor", "Anderson", "Thomas", "Jackson", "White", "Harris", "Martin", "Thompson", "Garcia",
    "Martinez", "Robinson",
];

const SEED_DEPARTMENTS: [Department; 6] = [
    Department::Icu,
    Department::Emergency,
    Department::GeneralMedicine,
    Department::Cardiology,
    Department::Neurology,
    Department::Surgery,
];

/// A group of similar patients.
struct Cohort {
    status: PatientStatus,
    level: RiskLevel,
    baseline: Baseline,
    count: usize,
}

#[derive(Clone, Copy)]
struct Baseline {
    temperature: f64,
    heart_rate: f64,
    respiratory_rate: f64,
    oxygen_saturation: f64,
}

const COHORTS: [Cohort; 4] = [
    Cohort {
        status: PatientStatus::Active,
        level: RiskLevel::Low,
        baseline: Baseline { temperature: 36.8, heart_rate: 75.0, respiratory_rate: 15.0, oxygen_saturation: 98.0 },
        count: 15,
    },
    Cohort {
        status: PatientStatus::Active,
        level: RiskLevel::Medium,
        baseline: Baseline { temperature: 37.5, heart_rate: 90.0, respiratory_rate: 19.0, oxygen_saturation: 96.0 },
        count: 8,
    },
    Cohort {
        status: PatientStatus::Critical,
        level: RiskLevel::High,
        baseline: Baseline { temperature: 38.5, heart_rate: 110.0, respiratory_rate: 24.0, oxygen_saturation: 92.0 },
        count: 4,
    },
    Cohort {
        status: PatientStatus::Discharged,
        level: RiskLevel::Low,
        baseline: Baseline { temperature: 36.9, heart_rate: 78.0, respiratory_rate: 16.0, oxygen_saturation: 99.0 },
        count: 10,
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub doctors: usize,
    pub patients: usize,
}

fn text(value: &str) -> CoreResult<NonEmptyText> {
    Ok(NonEmptyText::new(value)?)
}

/// Registers the account unless the e-mail is already taken, in which case the existing
/// account is reused.
fn ensure_user(
    users: &UserService,
    name: &str,
    email: &str,
    role: Role,
    department: Department,
) -> CoreResult<(User, bool)> {
    let email = EmailAddress::parse(email)?;
    if let Some(existing) = users.find_by_email(&email)? {
        return Ok((existing, false));
    }

    let registration = Registration {
        name: text(name)?,
        email,
        password: DEMO_PASSWORD.to_string(),
        role: Some(role),
        department,
    };
    Ok((users.register(registration)?, true))
}

fn jitter(rng: &mut impl Rng, spread: f64) -> f64 {
    rng.gen_range(-spread..spread)
}

fn demo_vitals(rng: &mut impl Rng, baseline: Baseline, now: DateTime<Utc>) -> NewVitalSigns {
    let temperature = ((baseline.temperature + jitter(rng, 1.0)) * 10.0).round() / 10.0;
    let heart_rate = (baseline.heart_rate + jitter(rng, 10.0)).floor().max(0.0) as u32;
    let respiratory_rate = (baseline.respiratory_rate + jitter(rng, 3.0)).floor().max(0.0) as u32;
    let oxygen_saturation = (baseline.oxygen_saturation + jitter(rng, 2.0)).floor().clamp(0.0, 100.0);
    let systolic: u32 = rng.gen_range(105..135);
    let diastolic: u32 = rng.gen_range(70..90);
    let age = Duration::minutes(rng.gen_range(0..5 * 24 * 60));

    NewVitalSigns {
        temperature,
        heart_rate: Some(heart_rate),
        respiratory_rate: Some(respiratory_rate),
        blood_pressure: Some(format!("{systolic}/{diastolic}")),
        oxygen_saturation,
        recorded_at: Some(now - age),
        ..Default::default()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn demo_labs(rng: &mut impl Rng, level: RiskLevel, now: DateTime<Utc>) -> CoreResult<Vec<NewLabResult>> {
    let abnormal_chance = match level {
        RiskLevel::High => 0.8,
        RiskLevel::Medium => 0.4,
        RiskLevel::Low => 0.1,
    };

    let panel = [
        ("WBC Count", "K/µL", "4.5-11.0"),
        ("Lactate", "mmol/L", "0.5-2.2"),
        ("CRP", "mg/L", "<10"),
        ("Procalcitonin", "ng/mL", "<0.15"),
        ("Blood Culture", "", "Negative"),
    ];

    let mut labs = Vec::with_capacity(panel.len());
    for (test_type, unit, normal_range) in panel {
        let abnormal = rng.gen_bool(abnormal_chance);
        let mut biomarkers = Biomarkers::default();

        let value = match test_type {
            "WBC Count" => {
                let wbc = if !abnormal {
                    rng.gen_range(4.5..11.0)
                } else if rng.gen_bool(0.5) {
                    rng.gen_range(2.0..4.0)
                } else {
                    rng.gen_range(11.0..16.0)
                };
                let wbc = round_to(wbc, 1);
                biomarkers.wbc = Some(wbc);
                serde_json::json!(wbc)
            }
            "Lactate" => {
                let lactate = round_to(
                    if abnormal { rng.gen_range(2.2..5.2) } else { rng.gen_range(0.5..2.2) },
                    1,
                );
                biomarkers.lactate = Some(lactate);
                serde_json::json!(lactate)
            }
            "CRP" => serde_json::json!(round_to(
                if abnormal { rng.gen_range(10.0..200.0) } else { rng.gen_range(0.0..10.0) },
                1
            )),
            "Procalcitonin" => serde_json::json!(round_to(
                if abnormal { rng.gen_range(0.15..10.0) } else { rng.gen_range(0.0..0.15) },
                2
            )),
            _ => serde_json::json!(if abnormal { "Positive" } else { "Negative" }),
        };

        let age = Duration::minutes(rng.gen_range(0..3 * 24 * 60));
        labs.push(NewLabResult {
            reading: LabReading {
                test_type: text(test_type)?,
                value: Some(value),
                unit: Some(unit.to_string()).filter(|u| !u.is_empty()),
                normal_range: Some(normal_range.to_string()),
                is_abnormal: Some(abnormal),
                biomarkers,
                risk_percent: None,
                risk_level: None,
            },
            recorded_at: Some(now - age),
        });
    }
    Ok(labs)
}

fn score_for(rng: &mut impl Rng, level: RiskLevel) -> CoreResult<RiskScore> {
    let value = match level {
        RiskLevel::Low => rng.gen_range(20..50),
        RiskLevel::Medium => rng.gen_range(50..75),
        RiskLevel::High => rng.gen_range(75..100),
    };
    RiskScore::new(value)
}

fn unique_mrn(rng: &mut impl Rng, used: &mut HashSet<String>) -> String {
    loop {
        let candidate = format!("MRN{}", rng.gen_range(100_000..1_000_000));
        if used.insert(candidate.clone()) {
            return candidate;
        }
    }
}

/// Populates the stores with demo accounts, doctor profiles and patients.
///
/// Accounts that already exist are reused, so seeding twice only adds patients.
pub fn seed_demo_data(
    users: &UserService,
    doctors: &DoctorService,
    patients: &PatientService,
    rng: &mut impl Rng,
) -> CoreResult<SeedSummary> {
    let now = Utc::now();
    let mut summary = SeedSummary::default();

    let accounts = [
        ("Admin User", "admin@example.com", Role::Admin, Department::Icu),
        ("Dr. John Smith", "doctor@example.com", Role::Doctor, Department::Icu),
        ("Dr. Sarah Johnson", "sarah@example.com", Role::Doctor, Department::Emergency),
        ("Nurse Emily", "nurse@example.com", Role::Nurse, Department::Icu),
    ];
    let mut doctor_accounts: Vec<RecordId> = Vec::new();
    for (name, email, role, department) in accounts {
        let (user, created) = ensure_user(users, name, email, role, department)?;
        if created {
            summary.users += 1;
        }
        if role == Role::Doctor {
            doctor_accounts.push(user.id.clone());
            if created {
                let profile = doctor_profile(&user)?;
                doctors.create(profile)?;
                summary.doctors += 1;
            }
        }
    }

    let mut used_mrns: HashSet<String> = patients
        .repository()
        .list()?
        .into_iter()
        .filter_map(|p| p.medical_record_number)
        .collect();

    let mut number = 1;
    for cohort in &COHORTS {
        for _ in 0..cohort.count {
            let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
            let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");

            let days_ago = match cohort.status {
                PatientStatus::Discharged => rng.gen_range(10..30),
                _ => rng.gen_range(1..10),
            };

            let vitals_count = rng.gen_range(3..=7);
            let vital_signs = (0..vitals_count)
                .map(|_| demo_vitals(rng, cohort.baseline, now))
                .collect();

            let input = NewPatient {
                name: text(&format!("{first} {last}"))?,
                age: rng.gen_range(30..80),
                gender: if rng.gen_bool(0.5) { Gender::Male } else { Gender::Female },
                admission_date: now - Duration::days(days_ago),
                department: SEED_DEPARTMENTS
                    .choose(rng)
                    .copied()
                    .unwrap_or(Department::GeneralMedicine),
                medical_record_number: Some(unique_mrn(rng, &mut used_mrns)),
                status: Some(cohort.status),
                risk_score: Some(score_for(rng, cohort.level)?),
                medical_history: Some(format!("Patient {number} medical history")),
                allergies: Some(
                    ["Penicillin", "No known allergies", "Sulfa drugs"]
                        .choose(rng)
                        .copied()
                        .unwrap_or("No known allergies")
                        .to_string(),
                ),
                medications: Some("Standard medication regimen".to_string()),
                notes: Some(format!("Notes for patient {number}")),
                assigned_doctor: doctor_accounts.choose(rng).cloned(),
                vital_signs,
                lab_results: demo_labs(rng, cohort.level, now)?,
            };

            patients.create(input)?;
            summary.patients += 1;
            number += 1;
        }
    }

    tracing::info!(
        "-- Seeded {} users, {} doctor profiles, {} patients",
        summary.users,
        summary.doctors,
        summary.patients
    );
    Ok(summary)
}

fn doctor_profile(user: &User) -> CoreResult<NewDoctor> {
    let (specialty, bio, position, experience, qualifications, phone) =
        if user.email.as_str() == "doctor@example.com" {
            (
                "Critical Care",
                "Board-certified intensivist with over 10 years of experience in critical care medicine.",
                "Senior Intensivist",
                10,
                vec!["MD", "Board Certified in Critical Care", "Fellowship in Pulmonary Medicine"],
                "555-123-4567",
            )
        } else {
            (
                "Emergency Medicine",
                "Emergency medicine specialist with expertise in early sepsis recognition and management.",
                "Emergency Department Head",
                8,
                vec!["MD", "Board Certified in Emergency Medicine"],
                "555-987-6543",
            )
        };

    Ok(NewDoctor {
        name: user.name.clone(),
        specialty: text(specialty)?,
        bio: text(bio)?,
        image_url: None,
        position: Some(position.to_string()),
        experience: Some(experience),
        qualifications: qualifications.into_iter().map(str::to_string).collect(),
        contact_info: ContactInfo {
            email: Some(user.email.as_str().to_string()),
            phone: Some(phone.to_string()),
        },
        user_id: Some(user.id.clone()),
    })
}
