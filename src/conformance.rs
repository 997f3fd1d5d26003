//! Setup-time checks that an implementation really provides what its interface declares.

use crate::{
    error::SetupError,
    implementation::Bindings,
    procedure::{InterfaceDescriptor, ProcedureDescriptor},
};

/// Check one declared procedure against the implementation's bindings: the
/// implementation must bind its own body, with the declared calling convention.
pub fn check<S>(
    interface: &InterfaceDescriptor,
    procedure: &ProcedureDescriptor,
    bindings: &Bindings<S>,
) -> Result<(), SetupError>
where
    S: Send + Sync + 'static,
{
    let body = bindings
        .get(procedure.name())
        .ok_or_else(|| SetupError::NotImplemented {
            interface: interface.name().to_owned(),
            procedure: procedure.name().to_owned(),
        })?;

    let declared = procedure.convention();
    let implemented = body.convention();
    if declared != implemented {
        return Err(SetupError::CallingConventionMismatch {
            interface: interface.name().to_owned(),
            procedure: procedure.name().to_owned(),
            declared,
            implemented,
        });
    }
    Ok(())
}
