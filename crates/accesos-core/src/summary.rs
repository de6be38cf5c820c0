//! The approver's dashboard: headcounts and workload, computed from plain
//! directory and request data.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  directory::{Office, Person},
  request::Request,
  status::{ActivityStatus, RequestKind, RequestStatus},
};

/// Persons attached to one office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfficeCount {
  pub office_id:   Uuid,
  /// `None` when the office id is not in the office list.
  pub office_name: Option<String>,
  pub count:       usize,
}

/// Requests per kind, plus their total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
  pub alta:         usize,
  pub baja:         usize,
  pub modificacion: usize,
  pub total:        usize,
}

impl KindCounts {
  fn add(&mut self, kind: RequestKind) {
    match kind {
      RequestKind::Alta => self.alta += 1,
      RequestKind::Baja => self.baja += 1,
      RequestKind::Modificacion => self.modificacion += 1,
    }
    self.total += 1;
  }
}

/// Open BAJA requests, split by whether anyone has picked them up yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BajaBacklog {
  /// `PENDIENTE_BAJA`.
  pub not_started: usize,
  /// `EN_PROCESO_BAJA` or `TECNICO_BAJA`.
  pub in_progress: usize,
  pub total:       usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub active_persons:      usize,
  pub inactive_persons:    usize,
  /// Largest office first; ties by name.
  pub persons_by_office:   Vec<OfficeCount>,
  /// Requests in `PARA_VALIDAR_*`.
  pub awaiting_validation: KindCounts,
  pub pending_baja:        BajaBacklog,
}

impl Summary {
  pub fn compute(persons: &[Person], offices: &[Office], requests: &[Request]) -> Self {
    let names: HashMap<Uuid, &str> =
      offices.iter().map(|o| (o.office_id, o.name.as_str())).collect();

    let mut per_office: HashMap<Uuid, usize> = HashMap::new();
    let mut active_persons = 0;
    let mut inactive_persons = 0;
    for person in persons {
      match person.status {
        ActivityStatus::Activo => active_persons += 1,
        ActivityStatus::Inactivo => inactive_persons += 1,
      }
      *per_office.entry(person.office_id).or_default() += 1;
    }

    let mut persons_by_office: Vec<OfficeCount> = per_office
      .into_iter()
      .map(|(office_id, count)| OfficeCount {
        office_id,
        office_name: names.get(&office_id).map(|n| (*n).to_owned()),
        count,
      })
      .collect();
    persons_by_office.sort_by(|a, b| {
      b.count
        .cmp(&a.count)
        .then_with(|| a.office_name.cmp(&b.office_name))
        .then_with(|| a.office_id.cmp(&b.office_id))
    });

    let mut awaiting_validation = KindCounts::default();
    let mut pending_baja = BajaBacklog::default();
    for request in requests {
      match request.status {
        RequestStatus::ParaValidar(kind) => awaiting_validation.add(kind),
        RequestStatus::Pendiente(RequestKind::Baja) => {
          pending_baja.not_started += 1;
          pending_baja.total += 1;
        }
        RequestStatus::EnProceso(RequestKind::Baja)
        | RequestStatus::Tecnico(RequestKind::Baja) => {
          pending_baja.in_progress += 1;
          pending_baja.total += 1;
        }
        _ => {}
      }
    }

    Self {
      active_persons,
      inactive_persons,
      persons_by_office,
      awaiting_validation,
      pending_baja,
    }
  }
}
