use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sepshield_core::seed::{seed_demo_data, DEMO_PASSWORD};
use sepshield_core::services::patients::{PatientFilter, PatientQuery, PatientSortField};
use sepshield_core::store::Stores;
use sepshield_core::{
    calculate_risk_score, CoreConfig, Department, DoctorService, NewPatient, PageRequest,
    PatientService, PatientStatus, RiskLevel, ScoringInputs, SortSpec, StoreBackend, UserService,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sepshield")]
#[command(about = "SepShield sepsis monitoring CLI")]
struct Cli {
    /// Directory holding the file-backed records (default: $PATIENT_DATA_DIR or patient_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a set of vital signs without storing anything
    Score {
        /// Body temperature in °C
        #[arg(long)]
        temperature: f64,
        /// Beats per minute
        #[arg(long)]
        heart_rate: Option<u32>,
        /// Breaths per minute
        #[arg(long)]
        respiratory_rate: Option<u32>,
        /// SpO2 in percent
        #[arg(long)]
        oxygen_saturation: f64,
    },
    /// Load demo staff accounts, doctor profiles and patients
    Seed {
        /// Seed for the random generator, for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Import patients from a JSON file holding an array of patient records
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// List patients
    List {
        /// Active, Discharged or Critical
        #[arg(long)]
        status: Option<String>,
        /// Low, Medium or High
        #[arg(long)]
        risk_level: Option<String>,
        /// Department name, e.g. "ICU"
        #[arg(long)]
        department: Option<String>,
        /// Match on name or medical record number
        #[arg(long)]
        search: Option<String>,
        /// Sort field, prefix with '-' for descending (e.g. -riskScore)
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<String>,
    },
}

fn open_stores(data_dir: Option<PathBuf>) -> Result<Stores, Box<dyn std::error::Error>> {
    let data_dir = data_dir.unwrap_or_else(|| {
        PathBuf::from(
            std::env::var("PATIENT_DATA_DIR")
                .unwrap_or_else(|_| sepshield_core::DEFAULT_PATIENT_DATA_DIR.into()),
        )
    });
    let cfg = CoreConfig::new(data_dir, StoreBackend::File)?;
    Ok(Stores::open_files(&cfg)?)
}

/// Parses an optional filter value, failing on names that match nothing.
fn parse_filter<T>(
    raw: Option<String>,
    label: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    match raw {
        None => Ok(None),
        Some(value) => parse(&value)
            .map(Some)
            .ok_or_else(|| format!("unknown {label}: {value}")),
    }
}

fn read_import_file(path: &Path) -> Result<Vec<NewPatient>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Score {
            temperature,
            heart_rate,
            respiratory_rate,
            oxygen_saturation,
        }) => {
            let score = calculate_risk_score(&ScoringInputs {
                temperature,
                heart_rate,
                respiratory_rate,
                oxygen_saturation,
            });
            println!("Risk score: {} ({})", score, score.level());
        }
        Some(Commands::Seed { seed }) => {
            let stores = open_stores(cli.data_dir)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let summary = seed_demo_data(
                &UserService::new(stores.users.clone()),
                &DoctorService::new(stores.doctors.clone()),
                &PatientService::new(stores.patients.clone()),
                &mut rng,
            )?;
            println!(
                "Seeded {} users, {} doctors and {} patients",
                summary.users, summary.doctors, summary.patients
            );
            println!("Demo accounts use the password '{}'", DEMO_PASSWORD);
        }
        Some(Commands::Import { file }) => {
            let records = read_import_file(&file)?;
            let stores = open_stores(cli.data_dir)?;
            let service = PatientService::new(stores.patients.clone());

            let summary = service.import(records);
            for (index, error) in &summary.failed {
                eprintln!("Record {}: {}", index, error);
            }
            println!(
                "Imported {} patients ({} rejected)",
                summary.created.len(),
                summary.failed.len()
            );
        }
        Some(Commands::List {
            status,
            risk_level,
            department,
            search,
            sort,
            page,
            limit,
        }) => {
            let filter = PatientFilter {
                status: parse_filter(status, "status", PatientStatus::from_name)?,
                risk_level: parse_filter(risk_level, "risk level", RiskLevel::from_name)?,
                department: parse_filter(department, "department", Department::from_name)?,
                search,
            };
            let query = PatientQuery {
                filter,
                sort: SortSpec::parse(
                    sort.as_deref(),
                    PatientSortField::from_name,
                    PatientSortField::Name,
                ),
                page: PageRequest::from_raw(page.as_deref(), limit.as_deref()),
            };

            let stores = open_stores(cli.data_dir)?;
            let page = PatientService::new(stores.patients.clone()).list(&query)?;
            if page.items.is_empty() {
                println!("No patients found.");
            } else {
                for patient in &page.items {
                    println!(
                        "ID: {}, Name: {}, Department: {}, Status: {}, Risk: {} ({})",
                        patient.id,
                        patient.name.as_str(),
                        patient.department,
                        patient.status,
                        patient.risk_score(),
                        patient.risk_level()
                    );
                }
                println!(
                    "Page {} of {} ({} patients)",
                    page.current_page, page.total_pages, page.total
                );
            }
        }
        None => {
            println!("Use 'sepshield --help' for commands");
        }
    }

    Ok(())
}
