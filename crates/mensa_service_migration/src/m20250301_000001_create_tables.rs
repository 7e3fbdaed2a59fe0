use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Canteens mirrored from the OpenMensa canteen list. Ids are
        // upstream-assigned, so no auto increment here.
        manager
            .create_table(
                Table::create()
                    .table(Mensas::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Mensas::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Mensas::Name).string().not_null())
                    .col(ColumnDef::new(Mensas::City).string().not_null())
                    .col(ColumnDef::new(Mensas::Address).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Dishes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Dishes::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Dishes::MensaId).integer().not_null())
                    .col(ColumnDef::new(Dishes::Name).string().not_null())
                    .col(ColumnDef::new(Dishes::Category).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reviews::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reviews::Author).string().not_null())
                    .col(ColumnDef::new(Reviews::MensaId).integer().not_null())
                    .col(ColumnDef::new(Reviews::DishId).integer().not_null())
                    .col(ColumnDef::new(Reviews::Stars).integer().not_null())
                    .col(ColumnDef::new(Reviews::Comment).string())
                    .col(ColumnDef::new(Reviews::Timestamp).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_mensas_city")
                    .table(Mensas::Table)
                    .col(Mensas::City)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_dishes_mensa_id")
                    .table(Dishes::Table)
                    .col(Dishes::MensaId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reviews_dish_id")
                    .table(Reviews::Table)
                    .col(Reviews::DishId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Dishes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Mensas::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Mensas {
    Table,
    Id,
    Name,
    City,
    Address,
}

#[derive(DeriveIden)]
enum Dishes {
    Table,
    Id,
    MensaId,
    Name,
    Category,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    Author,
    MensaId,
    DishId,
    Stars,
    Comment,
    Timestamp,
}
