//! Default-endpoint switching via the IPolicyConfig COM interface
//! (undocumented but stable across Windows versions).

use windows::core::*;
use windows::Win32::System::Com::*;

use super::device::{AudioError, DeviceRole};

#[windows::core::interface("F8679F50-850A-41CF-9C72-430F290290C8")]
pub unsafe trait IPolicyConfig: IUnknown {
    // Reserved methods to maintain vtable order
    fn reserved1(&self) -> HRESULT;
    fn reserved2(&self) -> HRESULT;
    fn reserved3(&self) -> HRESULT;
    fn reserved4(&self) -> HRESULT;
    fn reserved5(&self) -> HRESULT;
    fn reserved6(&self) -> HRESULT;
    fn reserved7(&self) -> HRESULT;
    fn reserved8(&self) -> HRESULT;
    fn reserved9(&self) -> HRESULT;
    fn reserved10(&self) -> HRESULT;

    fn SetDefaultEndpoint(&self, device_id: PCWSTR, role: u32) -> HRESULT;
}

const CLSID_POLICY_CONFIG_CLIENT: GUID = GUID::from_u128(0x870af99c_171d_4f9e_af0d_e63df40c2bc9);

/// Set the endpoint (full MMDevice id string) as default for the given
/// roles in order, failing on the first rejected role.
pub fn set_default_endpoint(endpoint_id: &str, roles: &[DeviceRole]) -> Result<(), AudioError> {
    unsafe {
        let policy_config: IPolicyConfig =
            CoCreateInstance(&CLSID_POLICY_CONFIG_CLIENT, None, CLSCTX_ALL)
                .map_err(AudioError::SetDefaultFailed)?;

        let endpoint_wide: Vec<u16> = endpoint_id
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        for role in roles {
            policy_config
                .SetDefaultEndpoint(PCWSTR(endpoint_wide.as_ptr()), *role as u32)
                .ok()
                .map_err(AudioError::SetDefaultFailed)?;
        }
        Ok(())
    }
}
