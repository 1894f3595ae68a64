use std::{env, fs, path::Path};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`.\n\n// Do not edit this file manually.";
    let decls = [
        db::models::user::User::decl(),
        db::models::user::UpdateProfile::decl(),
        db::models::problem_category::ProblemCategory::decl(),
        db::models::problem::Problem::decl(),
        db::models::problem::CategorySummary::decl(),
        db::models::problem::ProblemWithCategory::decl(),
        db::models::problem::ProblemWithDetails::decl(),
        db::models::problem::UpdateProblem::decl(),
        db::models::affirmation::AffirmationType::decl(),
        db::models::affirmation::AffirmationSource::decl(),
        db::models::affirmation::Affirmation::decl(),
        db::models::affirmation::FavoriteAffirmation::decl(),
        db::models::session::Session::decl(),
        db::models::session::SessionWithProblem::decl(),
        db::models::session::UpdateSession::decl(),
        services::services::affirmations::AffirmationSet::decl(),
        services::services::affirmations::PersonalizationPreferences::decl(),
        services::services::problems::GeneratedAffirmation::decl(),
        services::services::problems::CreatedProblem::decl(),
        services::services::session_stats::SessionStats::decl(),
        services::services::session_stats::DailyPractice::decl(),
        server::routes::health::HealthStatus::decl(),
        server::routes::auth::SignUpRequest::decl(),
        server::routes::auth::SignUpResponse::decl(),
        server::routes::auth::SignInRequest::decl(),
        server::routes::auth::SignInResponse::decl(),
        server::routes::problems::CreateProblemRequest::decl(),
        server::routes::affirmations::GenerateAffirmationRequest::decl(),
        server::routes::sessions::CreateSessionRequest::decl(),
        utils::response::ApiResponse::<()>::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                d
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}\n\n{body}\n")
}

fn main() -> std::io::Result<()> {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../shared"));
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        } else {
            eprintln!("❌ shared/types.ts is not up to date. Please run 'cargo run --bin generate_types' and commit the changes.");
            std::process::exit(1);
        }
    }

    fs::create_dir_all(shared_path)?;
    fs::write(&types_path, generated)?;
    println!("✅ TypeScript types generated in {}", types_path.display());
    Ok(())
}
