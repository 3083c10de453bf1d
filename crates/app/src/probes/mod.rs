pub mod camera;
pub mod common;
pub mod microphone;
pub mod network;
pub mod thresholds;

pub use camera::CameraCheck;
pub use common::{
    ensure_results_dir, write_report_json, CheckContext, CheckError, CheckErrorKind, CheckReport,
};
pub use microphone::MicrophoneCheck;
pub use network::NetworkCheck;
pub use thresholds::Thresholds;

/// One device/network verification. Implementations acquire the capability,
/// read the relevant scalars, compare against thresholds, and report.
#[async_trait::async_trait]
pub trait SystemCheck: Send {
    fn name(&self) -> &'static str;
    async fn run(&mut self, ctx: &CheckContext) -> Result<CheckReport, CheckError>;
}
