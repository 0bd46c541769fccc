//! Invoice service (C9): a billing record layered on top of a completed
//! sale, one per sale at most.

use std::sync::Arc;

use chrono::Utc;

use vendix_auth::policy::require_owner_or_admin;
use vendix_core::model::{Id, Invoice};
use vendix_core::{Principal, VendixError, VendixResult};
use vendix_repo::{DeliveryAddressRepository, InvoiceRepository, RepoError, SaleRepository};

async fn require_address_owned_by<D: DeliveryAddressRepository>(
    addresses: &D,
    delivery_address_id: Id,
    sale_owner: Id,
) -> VendixResult<()> {
    let address = addresses
        .find_by_id(delivery_address_id)
        .await
        .map_err(RepoError::into_vendix_error)?
        .ok_or_else(|| VendixError::address_not_found(delivery_address_id))?;
    if address.user_id != sale_owner {
        return Err(VendixError::forbidden("delivery address does not belong to the sale owner"));
    }
    Ok(())
}

/// Invoice service.
#[derive(Debug)]
pub struct InvoiceService<I> {
    invoices: Arc<I>,
}

impl<I: InvoiceRepository> InvoiceService<I> {
    /// Construct a service over the given invoice repository.
    pub fn new(invoices: Arc<I>) -> Self {
        Self { invoices }
    }

    /// Issue an invoice for `sale_id` without checking the sale exists or
    /// is owned by anyone in particular. Used internally by checkout,
    /// which has already validated the sale within the same transaction.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn create_invoice_unchecked(&self, sale_id: Id, delivery_address_id: Id) -> VendixResult<Invoice> {
        self.invoices
            .insert(Invoice {
                id: 0,
                sale_id,
                delivery_address_id,
                issued_at: Utc::now(),
            })
            .await
            .map_err(RepoError::into_vendix_error)
    }

    /// Issue an invoice for an existing sale on behalf of `principal`.
    ///
    /// # Errors
    ///
    /// - [`vendix_core::ErrorKind::NotFound`] if the sale or delivery
    ///   address does not exist.
    /// - [`vendix_core::ErrorKind::Forbidden`] unless `principal` owns the
    ///   sale or is an admin, or the delivery address does not belong to
    ///   the sale's owner.
    pub async fn create_invoice<S: SaleRepository, D: DeliveryAddressRepository>(
        &self,
        sales: &S,
        addresses: &D,
        sale_id: Id,
        delivery_address_id: Id,
        principal: &Principal,
    ) -> VendixResult<Invoice> {
        let sale = sales
            .find_by_id(sale_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::sale_not_found(sale_id))?;
        require_owner_or_admin(principal, sale.user_id)?;
        require_address_owned_by(addresses, delivery_address_id, sale.user_id).await?;
        self.create_invoice_unchecked(sale_id, delivery_address_id).await
    }

    /// Fetch an invoice, scoped by ownership of the underlying sale.
    ///
    /// # Errors
    ///
    /// - [`vendix_core::ErrorKind::NotFound`] if the invoice or its sale do
    ///   not exist.
    /// - [`vendix_core::ErrorKind::Forbidden`] unless `principal` owns the
    ///   sale or is an admin.
    pub async fn get_invoice<S: SaleRepository>(&self, sales: &S, id: Id, principal: &Principal) -> VendixResult<Invoice> {
        let invoice = self
            .invoices
            .find_by_id(id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::invoice_not_found(id))?;
        let sale = sales
            .find_by_id(invoice.sale_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::sale_not_found(invoice.sale_id))?;
        require_owner_or_admin(principal, sale.user_id)?;
        Ok(invoice)
    }

    /// Reassign the delivery address an invoice was issued against. No
    /// other field is mutable once issued. The new address must still
    /// belong to the sale's owner.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_invoice`], plus [`vendix_core::ErrorKind::Forbidden`]
    /// if `new_delivery_address_id` does not belong to the sale's owner, and
    /// propagating update failures.
    pub async fn update_invoice<S: SaleRepository, D: DeliveryAddressRepository>(
        &self,
        sales: &S,
        addresses: &D,
        id: Id,
        new_delivery_address_id: Id,
        principal: &Principal,
    ) -> VendixResult<Invoice> {
        let mut invoice = self.get_invoice(sales, id, principal).await?;
        let sale = sales
            .find_by_id(invoice.sale_id)
            .await
            .map_err(RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::sale_not_found(invoice.sale_id))?;
        require_address_owned_by(addresses, new_delivery_address_id, sale.user_id).await?;
        invoice.delivery_address_id = new_delivery_address_id;
        self.invoices.update(invoice).await.map_err(RepoError::into_vendix_error)
    }

    /// Hard-delete an invoice.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_invoice`].
    pub async fn delete_invoice<S: SaleRepository>(&self, sales: &S, id: Id, principal: &Principal) -> VendixResult<()> {
        self.get_invoice(sales, id, principal).await?;
        self.invoices.delete(id).await.map_err(RepoError::into_vendix_error)
    }

    /// List every invoice belonging to `user_id`'s sales.
    ///
    /// # Errors
    ///
    /// [`vendix_core::ErrorKind::Forbidden`] unless `principal` owns
    /// `user_id` or is an admin.
    pub async fn list_for_user(&self, user_id: Id, principal: &Principal) -> VendixResult<Vec<Invoice>> {
        require_owner_or_admin(principal, user_id)?;
        self.invoices.list_for_user(user_id).await.map_err(RepoError::into_vendix_error)
    }
}
