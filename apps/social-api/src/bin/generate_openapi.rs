use std::process::ExitCode;

use utoipa::OpenApi;

fn main() -> ExitCode {
    let spec = match social_api::routes::ApiDoc::openapi().to_pretty_json() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("failed to render OpenAPI document: {e}");
            return ExitCode::FAILURE;
        }
    };

    let out = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../specs/social-api.json");
    let written = out
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(&out, spec));
    if let Err(e) = written {
        eprintln!("failed to write {}: {e}", out.display());
        return ExitCode::FAILURE;
    }

    println!("Wrote {}", out.display());
    ExitCode::SUCCESS
}
