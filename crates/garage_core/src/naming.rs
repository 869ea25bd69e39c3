/// Returns `base` if it does not collide with `existing`, otherwise
/// `base_n` for the smallest n >= 2 that is free. Deterministic: the same
/// inputs always produce the same name.
pub fn allocate_unique_name(base: &str, existing: &[String]) -> String {
    if !existing.iter().any(|n| n == base) {
        return base.to_string();
    }

    let mut n: u32 = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !existing.iter().any(|name| *name == candidate) {
            return candidate;
        }
        n += 1;
    }
}
