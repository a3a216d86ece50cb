//! Row types for the shared tables.
//!
//! Every tenant-owned type implements [`crate::scope::TenantOwned`] and is
//! read and written only through a [`crate::scope::ScopedRepository`].

pub mod access;
pub mod audit;
pub mod catalog;
pub mod commerce;
pub mod customer;
pub mod marketing;

pub use access::{RoleAssignment, RoleGrant, SuperAdmin};
pub use audit::{AdminAuditEntry, AuditAction, NewAuditEntry};
pub use catalog::{
    AssociationSettings, Category, CategoryPatch, NewCategory, PoolMembership, Product,
    SharedStockPool,
    StorefrontProduct, TenantProduct,
};
pub use commerce::{CartItem, NewCartItem, NewOrder, Order, OrderLine, OrderPatch, OrderStatus};
pub use customer::{AnalyticsEvent, NewAnalyticsEvent, NewUserProfile, UserProfile};
pub use marketing::{Coupon, DiscountKind, NewCoupon, NewPromotion, Promotion};
