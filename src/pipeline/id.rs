/// Derives the join key for a game name.
///
/// Lower-cases the name and replaces every character outside `[a-z0-9]` with `-`, one
/// separator per replaced character. Distinct names can collide ("Half-Life" and "Half Life"
/// share an id); the pipeline treats them as the same game.
pub fn derive_id(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect()
}
