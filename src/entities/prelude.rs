pub use super::saved_filters::Entity as SavedFilters;
pub use super::tags::Entity as Tags;
pub use super::transaction_chains::Entity as TransactionChains;
pub use super::transaction_relations::Entity as TransactionRelations;
pub use super::transaction_tags::Entity as TransactionTags;
pub use super::transactions::Entity as Transactions;
