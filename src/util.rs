/// Approximate human readable size, e.g. `4.2 KiB`
#[expect(
    clippy::cast_precision_loss,
    reason = "This is just an approximation of data size"
)]
pub fn human_size(size: u64) -> String {
    human_bytes::human_bytes(size as f64)
}
