//! Record store seam between the views and the backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::BackendClient;
use crate::db;
use crate::error::Result;
use crate::models::{
    Delivery, DeliveryPhotos, NewDelivery, NewVisitor, RecordKind, UpdateDelivery, UpdateVisitor, Visitor,
    VisitorPhotos,
};
use crate::session::SessionContext;

/// Gate record operations used by the forms, exit, dashboard and reports.
#[async_trait]
pub trait GateStore: Send + Sync {
    async fn all_visitors(&self) -> Result<Vec<Visitor>>;
    async fn all_deliveries(&self) -> Result<Vec<Delivery>>;
    async fn active_visitors(&self) -> Result<Vec<Visitor>>;
    async fn active_deliveries(&self) -> Result<Vec<Delivery>>;
    async fn visitors_since(&self, since: DateTime<Utc>) -> Result<Vec<Visitor>>;
    async fn deliveries_since(&self, since: DateTime<Utc>) -> Result<Vec<Delivery>>;

    async fn insert_visitor(&self, data: NewVisitor) -> Result<Visitor>;
    async fn insert_delivery(&self, data: NewDelivery) -> Result<Delivery>;

    /// Set the exit of an active record. `false` when it had already left.
    async fn mark_exit(&self, kind: RecordKind, id: i64, at: DateTime<Utc>) -> Result<bool>;

    async fn update_visitor(&self, id: i64, data: UpdateVisitor) -> Result<Option<Visitor>>;
    async fn update_delivery(&self, id: i64, data: UpdateDelivery) -> Result<Option<Delivery>>;

    async fn visitor_photos(&self, id: i64) -> Result<VisitorPhotos>;
    async fn delivery_photos(&self, id: i64) -> Result<DeliveryPhotos>;
}

/// Store backed by the hosted tables, scoped to one session.
pub struct RemoteStore {
    client: BackendClient,
    ctx: SessionContext,
}

impl RemoteStore {
    pub fn new(client: BackendClient, ctx: SessionContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl GateStore for RemoteStore {
    async fn all_visitors(&self) -> Result<Vec<Visitor>> {
        db::visitor::list_all(&self.client, &self.ctx).await
    }

    async fn all_deliveries(&self) -> Result<Vec<Delivery>> {
        db::delivery::list_all(&self.client, &self.ctx).await
    }

    async fn active_visitors(&self) -> Result<Vec<Visitor>> {
        db::visitor::list_active(&self.client, &self.ctx).await
    }

    async fn active_deliveries(&self) -> Result<Vec<Delivery>> {
        db::delivery::list_active(&self.client, &self.ctx).await
    }

    async fn visitors_since(&self, since: DateTime<Utc>) -> Result<Vec<Visitor>> {
        db::visitor::list_since(&self.client, &self.ctx, since).await
    }

    async fn deliveries_since(&self, since: DateTime<Utc>) -> Result<Vec<Delivery>> {
        db::delivery::list_since(&self.client, &self.ctx, since).await
    }

    async fn insert_visitor(&self, data: NewVisitor) -> Result<Visitor> {
        db::visitor::insert(&self.client, &self.ctx, &data).await
    }

    async fn insert_delivery(&self, data: NewDelivery) -> Result<Delivery> {
        db::delivery::insert(&self.client, &self.ctx, &data).await
    }

    async fn mark_exit(&self, kind: RecordKind, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let updated = match kind {
            RecordKind::Visitor => db::visitor::mark_exit(&self.client, &self.ctx, id, at).await?.is_some(),
            RecordKind::Delivery => db::delivery::mark_exit(&self.client, &self.ctx, id, at).await?.is_some(),
        };
        Ok(updated)
    }

    async fn update_visitor(&self, id: i64, data: UpdateVisitor) -> Result<Option<Visitor>> {
        db::visitor::update(&self.client, &self.ctx, id, &data).await
    }

    async fn update_delivery(&self, id: i64, data: UpdateDelivery) -> Result<Option<Delivery>> {
        db::delivery::update(&self.client, &self.ctx, id, &data).await
    }

    async fn visitor_photos(&self, id: i64) -> Result<VisitorPhotos> {
        db::visitor::get_photos(&self.client, &self.ctx, id).await
    }

    async fn delivery_photos(&self, id: i64) -> Result<DeliveryPhotos> {
        db::delivery::get_photos(&self.client, &self.ctx, id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::GateRecord;
    use std::sync::Mutex;

    /// In-memory store counting every call.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub visitors: Mutex<Vec<Visitor>>,
        pub deliveries: Mutex<Vec<Delivery>>,
        calls: Mutex<usize>,
    }

    impl FakeStore {
        pub(crate) fn with_records(visitors: Vec<Visitor>, deliveries: Vec<Delivery>) -> Self {
            Self {
                visitors: Mutex::new(visitors),
                deliveries: Mutex::new(deliveries),
                calls: Mutex::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn hit(&self) {
            *self.calls.lock().unwrap() += 1;
        }
    }

    #[async_trait]
    impl GateStore for FakeStore {
        async fn all_visitors(&self) -> Result<Vec<Visitor>> {
            self.hit();
            Ok(self.visitors.lock().unwrap().clone())
        }

        async fn all_deliveries(&self) -> Result<Vec<Delivery>> {
            self.hit();
            Ok(self.deliveries.lock().unwrap().clone())
        }

        async fn active_visitors(&self) -> Result<Vec<Visitor>> {
            self.hit();
            Ok(self.visitors.lock().unwrap().iter().filter(|v| v.is_active()).cloned().collect())
        }

        async fn active_deliveries(&self) -> Result<Vec<Delivery>> {
            self.hit();
            Ok(self.deliveries.lock().unwrap().iter().filter(|d| d.is_active()).cloned().collect())
        }

        async fn visitors_since(&self, since: DateTime<Utc>) -> Result<Vec<Visitor>> {
            self.hit();
            Ok(self.visitors.lock().unwrap().iter().filter(|v| v.entry_time >= since).cloned().collect())
        }

        async fn deliveries_since(&self, since: DateTime<Utc>) -> Result<Vec<Delivery>> {
            self.hit();
            Ok(self.deliveries.lock().unwrap().iter().filter(|d| d.entry_time >= since).cloned().collect())
        }

        async fn insert_visitor(&self, data: NewVisitor) -> Result<Visitor> {
            self.hit();
            let mut visitors = self.visitors.lock().unwrap();
            let visitor = Visitor {
                id: visitors.len() as i64 + 1,
                work_id: data.work_id,
                user_id: Some(data.user_id),
                name: data.name,
                document: data.document,
                company: data.company,
                visit_reason: data.visit_reason,
                person_visited: data.person_visited,
                epi: data.epi,
                vehicle: data.vehicle,
                photo: Some(data.photo),
                plate_photo: data.plate_photo,
                entry_time: data.entry_time,
                exit_time: None,
            };
            visitors.push(visitor.clone());
            Ok(visitor)
        }

        async fn insert_delivery(&self, data: NewDelivery) -> Result<Delivery> {
            self.hit();
            let mut deliveries = self.deliveries.lock().unwrap();
            let delivery = Delivery {
                id: deliveries.len() as i64 + 1,
                work_id: data.work_id,
                user_id: Some(data.user_id),
                supplier: data.supplier,
                driver_name: data.driver_name,
                driver_document: data.driver_document,
                invoice_number: data.invoice_number,
                license_plate: data.license_plate,
                invoice_photo: Some(data.invoice_photo),
                plate_photo: Some(data.plate_photo),
                entry_time: data.entry_time,
                exit_time: None,
            };
            deliveries.push(delivery.clone());
            Ok(delivery)
        }

        async fn mark_exit(&self, kind: RecordKind, id: i64, at: DateTime<Utc>) -> Result<bool> {
            self.hit();
            match kind {
                RecordKind::Visitor => Ok(self
                    .visitors
                    .lock()
                    .unwrap()
                    .iter_mut()
                    .find(|v| v.id == id)
                    .is_some_and(|v| v.mark_exit(at))),
                RecordKind::Delivery => Ok(self
                    .deliveries
                    .lock()
                    .unwrap()
                    .iter_mut()
                    .find(|d| d.id == id)
                    .is_some_and(|d| d.mark_exit(at))),
            }
        }

        async fn update_visitor(&self, id: i64, data: UpdateVisitor) -> Result<Option<Visitor>> {
            self.hit();
            let mut visitors = self.visitors.lock().unwrap();
            let Some(visitor) = visitors.iter_mut().find(|v| v.id == id) else {
                return Ok(None);
            };
            if let Some(company) = data.company {
                visitor.company = company;
            }
            if let Some(name) = data.name {
                visitor.name = name;
            }
            Ok(Some(visitor.clone()))
        }

        async fn update_delivery(&self, id: i64, data: UpdateDelivery) -> Result<Option<Delivery>> {
            self.hit();
            let mut deliveries = self.deliveries.lock().unwrap();
            let Some(delivery) = deliveries.iter_mut().find(|d| d.id == id) else {
                return Ok(None);
            };
            if let Some(invoice) = data.invoice_number {
                delivery.invoice_number = invoice;
            }
            Ok(Some(delivery.clone()))
        }

        async fn visitor_photos(&self, id: i64) -> Result<VisitorPhotos> {
            self.hit();
            let visitors = self.visitors.lock().unwrap();
            let visitor = visitors
                .iter()
                .find(|v| v.id == id)
                .ok_or_else(|| AppError::not_found(format!("visitante {id}")))?;
            Ok(VisitorPhotos {
                photo: visitor.photo.clone(),
                plate_photo: visitor.plate_photo.clone(),
            })
        }

        async fn delivery_photos(&self, id: i64) -> Result<DeliveryPhotos> {
            self.hit();
            let deliveries = self.deliveries.lock().unwrap();
            let delivery = deliveries
                .iter()
                .find(|d| d.id == id)
                .ok_or_else(|| AppError::not_found(format!("entrega {id}")))?;
            Ok(DeliveryPhotos {
                invoice_photo: delivery.invoice_photo.clone(),
                plate_photo: delivery.plate_photo.clone(),
            })
        }
    }
}
