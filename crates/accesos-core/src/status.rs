//! The status vocabulary shared by requests, line items and persons.
//!
//! The strings produced here are the canonical values already stored by the
//! existing portal (`PENDIENTE_ALTA`, `OBSERVADO`, ...). Every persistence or
//! transport adapter must round-trip them unchanged.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::Error;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// What a request does to the target's entitlements. Fixed at creation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
  /// Grant access to a new or returning person.
  Alta,
  /// Revoke access and deactivate the person.
  Baja,
  /// Grant additional access to an already-active person.
  Modificacion,
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// The position of a request in its lifecycle, without the kind suffix.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
  Pendiente,
  EnProceso,
  Tecnico,
  ParaValidar,
  Completado,
  Observado,
  Anulado,
}

// ─── RequestStatus ───────────────────────────────────────────────────────────

/// A request's status: a (phase, kind) pair for the main progression, plus the
/// two kind-less side states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RequestStatus {
  Pendiente(RequestKind),
  EnProceso(RequestKind),
  Tecnico(RequestKind),
  ParaValidar(RequestKind),
  Completado(RequestKind),
  /// Sent back to the requester with a reason.
  Observado,
  /// Cancelled by the requester. Terminal.
  Anulado,
}

impl RequestStatus {
  pub fn phase(self) -> Phase {
    match self {
      Self::Pendiente(_) => Phase::Pendiente,
      Self::EnProceso(_) => Phase::EnProceso,
      Self::Tecnico(_) => Phase::Tecnico,
      Self::ParaValidar(_) => Phase::ParaValidar,
      Self::Completado(_) => Phase::Completado,
      Self::Observado => Phase::Observado,
      Self::Anulado => Phase::Anulado,
    }
  }

  /// The kind suffix, if this status carries one.
  pub fn kind(self) -> Option<RequestKind> {
    match self {
      Self::Pendiente(k)
      | Self::EnProceso(k)
      | Self::Tecnico(k)
      | Self::ParaValidar(k)
      | Self::Completado(k) => Some(k),
      Self::Observado | Self::Anulado => None,
    }
  }

  /// `true` for `COMPLETADO_*` and `ANULADO`; no transition leaves these.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completado(_) | Self::Anulado)
  }

  /// Build a status from its parts. `Observado` and `Anulado` ignore `kind`.
  pub fn from_parts(phase: Phase, kind: RequestKind) -> Self {
    match phase {
      Phase::Pendiente => Self::Pendiente(kind),
      Phase::EnProceso => Self::EnProceso(kind),
      Phase::Tecnico => Self::Tecnico(kind),
      Phase::ParaValidar => Self::ParaValidar(kind),
      Phase::Completado => Self::Completado(kind),
      Phase::Observado => Self::Observado,
      Phase::Anulado => Self::Anulado,
    }
  }
}

impl fmt::Display for RequestStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind() {
      Some(kind) => write!(f, "{}_{}", self.phase(), kind),
      None => write!(f, "{}", self.phase()),
    }
  }
}

impl FromStr for RequestStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let unknown = || Error::UnknownStatus(s.to_owned());

    match s {
      "OBSERVADO" => return Ok(Self::Observado),
      "ANULADO" => return Ok(Self::Anulado),
      _ => {}
    }

    // The kind is always the last underscore-separated segment.
    let (phase, kind) = s.rsplit_once('_').ok_or_else(unknown)?;
    let phase = Phase::from_str(phase).map_err(|_| unknown())?;
    let kind = RequestKind::from_str(kind).map_err(|_| unknown())?;

    match phase {
      Phase::Observado | Phase::Anulado => Err(unknown()),
      _ => Ok(Self::from_parts(phase, kind)),
    }
  }
}

impl TryFrom<String> for RequestStatus {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<RequestStatus> for String {
  fn from(status: RequestStatus) -> Self { status.to_string() }
}

// ─── Line-item and person flags ──────────────────────────────────────────────

/// Per-system completion flag on a request line item.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttentionStatus {
  #[default]
  Pendiente,
  Completado,
}

/// Whether a person currently holds a working account.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
  #[default]
  Activo,
  Inactivo,
}
