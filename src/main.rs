mod actor_framework;
mod app_system;
mod checkout;
mod clients;
mod config;
mod domain;
mod local_cart;
mod pricing;
mod store;
mod user_actor;

#[cfg(test)]
mod mock_framework;

use tracing::{error, info, Instrument};

use crate::app_system::{setup_tracing, StorefrontSystem};
use crate::checkout::CheckoutForm;
use crate::clients::ProductForm;
use crate::config::AppConfig;
use crate::domain::{Identity, OrderStatus, PaymentMethod, UserCreate};

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenvy::dotenv().ok();
    setup_tracing();

    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    info!(?config, "Starting storefront");
    let system = StorefrontSystem::new(config);

    let span = tracing::info_span!("seed_catalog");
    let (saree_id, shawl_id) = async {
        let saree = system
            .admin
            .create_product(ProductForm {
                name: "Jamdani Saree".to_string(),
                category: "Saree".to_string(),
                price: "2500".to_string(),
                discount: "200".to_string(),
                stock: "3".to_string(),
                availability: "Ready".to_string(),
                ..Default::default()
            })
            .await?;
        let shawl = system
            .admin
            .create_product(ProductForm {
                name: "Kashmiri Shawl".to_string(),
                color: "Olive".to_string(),
                price: "1800".to_string(),
                stock: "0".to_string(),
                availability: "Pre Order".to_string(),
                ..Default::default()
            })
            .await?;
        Ok::<_, clients::AdminError>((saree, shawl))
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    // Anonymous visitor buys from the device-local cart.
    let span = tracing::info_span!("anonymous_cart_checkout");
    async {
        let saree = system
            .store
            .get_product(saree_id.clone())
            .await
            .map_err(|e| e.to_string())?
            .ok_or("seeded product missing")?;
        system
            .carts
            .add_to_cart(&Identity::Anonymous, &saree, 2)
            .await
            .map_err(|e| e.to_string())?;

        let ctx = system
            .carts
            .context_for(Identity::Anonymous)
            .await
            .map_err(|e| e.to_string())?;
        let quote = system
            .checkout
            .quote_cart(&ctx, "Mirpur, Dhaka", Some(PaymentMethod::CashOnDelivery))
            .await
            .map_err(|e| e.to_string())?;
        info!(?quote, "Cart quote");

        let form = CheckoutForm {
            name: "Ayesha Rahman".to_string(),
            phone: "01711000000".to_string(),
            address: "Mirpur, Dhaka".to_string(),
            payment_method: PaymentMethod::CashOnDelivery.to_string(),
            ..Default::default()
        };
        match system.checkout.checkout_cart(&ctx, &form).await {
            Ok(order) => info!(order_id = %order.id, paid = %order.paid, due = %order.due, "Cart order placed"),
            Err(e) => error!(error = %e, "Cart checkout failed"),
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    // Signed-in customer pre-orders directly from the product page.
    let span = tracing::info_span!("signed_in_pre_order");
    let pre_order_id = async {
        let user_id = system
            .users
            .create_user(UserCreate {
                name: "Karim Hossain".to_string(),
                email: "karim@example.com".to_string(),
            })
            .await
            .map_err(|e| e.to_string())?;
        let ctx = system
            .carts
            .context_for(Identity::SignedIn(user_id))
            .await
            .map_err(|e| e.to_string())?;

        let form = CheckoutForm {
            name: "Karim Hossain".to_string(),
            phone: "01911000000".to_string(),
            address: "Bank Town, Savar".to_string(),
            payment_method: PaymentMethod::Bkash.to_string(),
            account_number: "01911000000".to_string(),
            transaction_id: "9ABC12XYZ".to_string(),
        };
        let order = system
            .checkout
            .checkout_single(&ctx, &shawl_id, 4, &form)
            .await
            .map_err(|e| e.to_string())?;
        info!(order_id = %order.id, paid = %order.paid, due = %order.due, "Pre-order placed");
        Ok::<_, String>(order.id)
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("admin_console");
    async {
        for status in [OrderStatus::Processing, OrderStatus::Cancelled] {
            match system.admin.set_order_status(pre_order_id.clone(), status).await {
                Ok(order) => info!(order_id = %order.id, status = %order.status, "Status changed"),
                Err(e) => error!(error = %e, "Status change failed"),
            }
        }
        match system.admin.list_products().await {
            Ok(products) => {
                for product in products {
                    info!(product_id = %product.id, stock = ?product.stock, "Catalog entry");
                }
            }
            Err(e) => error!(error = %e, "Could not list products"),
        }
    }
    .instrument(span)
    .await;

    system.shutdown().await.map_err(|e| e.to_string())?;
    info!("Storefront stopped");
    Ok(())
}
