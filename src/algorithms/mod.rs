pub mod global;
pub mod icp;
pub mod kabsch;

pub use global::{GlobalAligner, PrincipalAxesAligner};
pub use icp::{IcpOutcome, IcpParams, IcpRefiner, IcpState};
pub use kabsch::{closed_form_alignment, solve_rigid_alignment};
