/// Computes the response-cache key: `H(provider || model || prompt)`
/// (spec §4.8), using `blake3` for a fast, collision-resistant digest.
pub fn fingerprint(provider: &str, model: &str, prompt: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(provider.as_bytes());
    hasher.update(b"\0");
    hasher.update(model.as_bytes());
    hasher.update(b"\0");
    hasher.update(prompt.as_bytes());
    hasher.finalize().to_hex().to_string()
}
