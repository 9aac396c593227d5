//! Line-mode payload rendering.

/// Header row written ahead of the first record in a new target.
pub const CSV_HEADER: &str = "created_at,nombre,telefono,email,cp,localidad,calleNumero,motivo";

/// Render the bytes for one record line.
///
/// A target that does not exist yet gets the fixed header row ahead of the
/// first data line. Every line is newline-terminated.
pub fn render(line: &str, target_exists: bool) -> Vec<u8> {
    if target_exists {
        format!("{line}\n").into_bytes()
    } else {
        format!("{CSV_HEADER}\n{line}\n").into_bytes()
    }
}
