//! DOM geography of the portal's generated pages.
//!
//! The portal is a GeneXus application: every control has a server-assigned
//! id, and grid cells carry a 4-digit, 1-based row suffix (`span_vNRO_0001`,
//! `span_vNRO_0002`, ...). The ids are stable per deployment but the grid
//! suffixes follow row position, so everything position-dependent goes
//! through [`cell_id`] and [`detail_control`].

/// Identification-type `<select>` on the login form.
pub const ID_TYPE_SELECT: &str = "vTIPOID";
/// Identifier input on the login form.
pub const ID_NUMBER_FIELD: &str = "vNROID";
/// Submit control of the login form.
pub const LOGIN_BUTTON: &str = "LOGIN";
/// Hidden textarea the reCAPTCHA widget writes its token into.
pub const RECAPTCHA_RESPONSE: &str = "g-recaptcha-response";
/// Back control on the detail view.
pub const BACK_BUTTON: &str = "VOLVER";

/// Heading shown on the authenticated accounts view.
pub const LIST_MARKER: &str = "Cuentas de la persona";
/// Phrase shown on a detail view with no outstanding items.
pub const NO_DEBT_MARKER: &str = "SIN COMPROBANTES PENDIENTES";
/// Path fragment identifying the login endpoint.
pub const LOGIN_URL_FRAGMENT: &str = "portalloginsinregistro";

/// Row-container id prefix of the accounts grid.
pub const ACCOUNT_ROW_PREFIX: &str = "GridcuentasContainerRow_";
/// Row-container id prefix of the line-item grid on the detail view.
pub const ITEM_ROW_PREFIX: &str = "GridcomprobantesContainerRow_";

/// Grid cell variables on the accounts view.
pub const CELL_NUMBER: &str = "vNRO";
pub const CELL_SERVICE: &str = "vSERVICIO";
pub const CELL_ADDRESS: &str = "vDOMICILIO";
pub const CELL_STATUS: &str = "vESTADO";

/// Labeled header controls on the detail view.
pub const DETAIL_ASSOCIATE: &str = "span_vASOCIADO";
pub const DETAIL_ADDRESS: &str = "span_vDOMICILIOCTA";
pub const DETAIL_PERIOD: &str = "span_vPERIODO";
/// Footer summary control on the detail view.
pub const DETAIL_SUMMARY: &str = "span_vRESUMEN";

/// Grid cell variables of the line-item grid.
pub const ITEM_ISSUED: &str = "vFECHAEMISION";
pub const ITEM_DUE: &str = "vFECHAVTO";
pub const ITEM_REFERENCE: &str = "vCOMPROBANTE";
pub const ITEM_AMOUNT: &str = "vIMPORTE";
pub const ITEM_STATUS: &str = "vESTADOCOMP";

/// The 4-digit, 1-based suffix GeneXus appends to grid cell ids.
pub fn row_suffix(position: usize) -> String {
    format!("{position:04}")
}

/// Id of a grid cell for a variable at a 1-based row position.
pub fn cell_id(variable: &str, position: usize) -> String {
    format!("span_{variable}_{}", row_suffix(position))
}

/// Id of the detail-view trigger control in a grid row.
pub fn detail_control(position: usize) -> String {
    format!("vDETALLE_{}", row_suffix(position))
}
